//! Knowledge-base interface for planner context retrieval.
//!
//! The real knowledge base (embedding index over SSURGO documentation) is
//! an external collaborator; this module defines the contract the pipeline
//! consumes plus a simple file-backed implementation so the tool runs end
//! to end without it.

mod store;

pub use store::FileKb;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One retrieved documentation snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Where the snippet came from (file name, "schema", ...).
    pub source: String,
    /// The snippet text.
    pub text: String,
}

/// Trait for knowledge bases that can retrieve context for a question.
pub trait KnowledgeBase: Send + Sync {
    /// Returns up to `k` snippets ranked by relevance to the question.
    fn search(&self, question: &str, k: usize) -> Result<Vec<Snippet>>;
}

/// A knowledge base over a fixed snippet list, for tests and callers that
/// bring their own retrieval.
#[derive(Debug, Clone, Default)]
pub struct StaticKb {
    snippets: Vec<Snippet>,
}

impl StaticKb {
    /// Creates a knowledge base returning the given snippets verbatim.
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }

    /// Creates a knowledge base that returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl KnowledgeBase for StaticKb {
    fn search(&self, _question: &str, k: usize) -> Result<Vec<Snippet>> {
        Ok(self.snippets.iter().take(k).cloned().collect())
    }
}
