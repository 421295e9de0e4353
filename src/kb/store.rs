//! File-backed knowledge base.
//!
//! Stores documentation chunks as JSON lines under the kb directory and
//! ranks them by keyword overlap with the question. A stand-in for the
//! external embedding index; good enough to give the planner schema notes
//! and glossary context.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SoilqError};

use super::{KnowledgeBase, Snippet};

/// File name of the snippet store inside the kb directory.
const SNIPPETS_FILE: &str = "snippets.jsonl";

/// Target chunk size in characters when splitting documents.
const CHUNK_CHARS: usize = 800;

/// File-backed [`KnowledgeBase`].
#[derive(Debug, Clone)]
pub struct FileKb {
    snippets: Vec<Snippet>,
}

impl FileKb {
    /// Loads a previously built knowledge base from `kb_dir`.
    pub fn open(kb_dir: &Path) -> Result<Self> {
        let path = kb_dir.join(SNIPPETS_FILE);
        let text = fs::read_to_string(&path).map_err(|e| {
            SoilqError::config(format!(
                "Knowledge base not found at {} (run build-kb first): {e}",
                path.display()
            ))
        })?;

        let mut snippets = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let snippet: Snippet = serde_json::from_str(line).map_err(|e| {
                SoilqError::config(format!("Corrupt snippet on line {}: {e}", i + 1))
            })?;
            snippets.push(snippet);
        }
        debug!("Loaded {} snippets from {}", snippets.len(), path.display());
        Ok(Self { snippets })
    }

    /// Builds the knowledge base from text/markdown documents plus the
    /// backend schema dump, writing `snippets.jsonl` under `kb_dir`.
    /// Returns the number of snippets written.
    pub fn build(kb_dir: &Path, docs: &[PathBuf], schema_text: &str) -> Result<usize> {
        fs::create_dir_all(kb_dir).map_err(|e| {
            SoilqError::config(format!("Cannot create {}: {e}", kb_dir.display()))
        })?;

        let mut snippets = vec![Snippet {
            source: "schema".to_string(),
            text: schema_text.to_string(),
        }];

        for doc in docs {
            let text = fs::read_to_string(doc).map_err(|e| {
                SoilqError::config(format!("Cannot read {}: {e}", doc.display()))
            })?;
            let source = doc
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| doc.display().to_string());
            for chunk in chunk_text(&text) {
                snippets.push(Snippet {
                    source: source.clone(),
                    text: chunk,
                });
            }
        }

        let path = kb_dir.join(SNIPPETS_FILE);
        let mut out = String::new();
        for snippet in &snippets {
            let line = serde_json::to_string(snippet)
                .map_err(|e| SoilqError::internal(format!("snippet serialization: {e}")))?;
            out.push_str(&line);
            out.push('\n');
        }
        fs::write(&path, out).map_err(|e| {
            SoilqError::config(format!("Cannot write {}: {e}", path.display()))
        })?;

        info!("Built knowledge base with {} snippets", snippets.len());
        Ok(snippets.len())
    }
}

impl KnowledgeBase for FileKb {
    fn search(&self, question: &str, k: usize) -> Result<Vec<Snippet>> {
        let question_tokens = tokenize(question);
        let mut scored: Vec<(usize, &Snippet)> = self
            .snippets
            .iter()
            .map(|snippet| {
                let tokens = tokenize(&snippet.text);
                let score = question_tokens.intersection(&tokens).count();
                (score, snippet)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Highest overlap first; stable for equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, s)| s.clone()).collect())
    }
}

/// Splits a document into paragraph-aligned chunks of roughly
/// [`CHUNK_CHARS`] characters.
fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + paragraph.len() > CHUNK_CHARS {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}
