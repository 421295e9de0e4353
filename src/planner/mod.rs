//! SQL planner interface.
//!
//! The planner itself is an external collaborator: something that turns a
//! question plus schema text, retrieved context, and few-shot examples
//! into a single SQL string. This module defines the contract, the
//! aggregation-override tokens, and an OpenAI-compatible client; the SQL
//! it returns is always re-validated by the guards before execution.

pub mod mock;
pub mod openai;
pub mod prompt;

pub use mock::MockPlanner;
pub use openai::{OpenAiPlanner, OpenAiPlannerConfig};

use std::str::FromStr;

use async_trait::async_trait;

use crate::error::Result;
use crate::kb::Snippet;

/// Aggregation override tokens accepted by the `method` control.
///
/// These are the NRCS aggregation-method codes the planner understands;
/// the executor never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggMethod {
    /// Dominant component (percent).
    Dcp,
    /// Dominant condition.
    Dcd,
    /// Weighted average.
    Wa,
    /// Minimum or maximum.
    Mom,
    /// Most limiting.
    Ml,
    /// Least limiting.
    Ll,
    /// Percent present.
    Pp,
    /// No aggregation necessary.
    Nan,
}

impl AggMethod {
    /// Returns the token as the planner expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dcp => "DCP",
            Self::Dcd => "DCD",
            Self::Wa => "WA",
            Self::Mom => "MOM",
            Self::Ml => "ML",
            Self::Ll => "LL",
            Self::Pp => "PP",
            Self::Nan => "NAN",
        }
    }
}

impl FromStr for AggMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DCP" => Ok(Self::Dcp),
            "DCD" => Ok(Self::Dcd),
            "WA" => Ok(Self::Wa),
            "MOM" => Ok(Self::Mom),
            "ML" => Ok(Self::Ml),
            "LL" => Ok(Self::Ll),
            "PP" => Ok(Self::Pp),
            "NAN" => Ok(Self::Nan),
            _ => Err(format!(
                "Invalid method: {s}. Expected one of DCP,DCD,WA,MOM,ML,LL,PP,NAN"
            )),
        }
    }
}

impl std::fmt::Display for AggMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the planner receives for one question.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// The natural-language question.
    pub question: String,
    /// Schema dump for the chosen backend.
    pub schema_text: String,
    /// Retrieved knowledge-base snippets.
    pub context: Vec<Snippet>,
    /// Aggregation override, if any.
    pub method: Option<AggMethod>,
    /// Depth window bottom in centimeters, if any.
    pub depth_cm: Option<u32>,
}

/// Trait for SQL planners.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SqlPlanner: Send + Sync {
    /// Produces a SQL string for the request.
    ///
    /// The returned text is untrusted; the caller must pass it through the
    /// backend's guard before execution.
    async fn plan(&self, request: &PlanRequest) -> Result<String>;
}
