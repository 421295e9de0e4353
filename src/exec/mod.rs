//! Query execution against the local and remote backends.
//!
//! Executors accept only [`GuardedQuery`] values minted by the matching
//! guard, run the primary (and optional series) SELECT, and normalize the
//! rows into a [`QueryResult`]. Executors are aggregation-agnostic: the
//! dominant-component vs weighted-average convention is a property of the
//! SQL the planner produced.

mod local;
mod remote;

pub use local::LocalExecutor;
pub use remote::{RemoteExecutor, DEFAULT_SDA_TIMEOUT_SECS, DEFAULT_SDA_URL};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SoilqError};
use crate::guard::{BackendKind, GuardedQuery};

/// Which backend an `ask` runs against, with its connection parameters.
#[derive(Debug, Clone)]
pub enum ExecutionBackend {
    /// Embedded SQLite database at the given path.
    Local { db_path: PathBuf },
    /// SDA-style tabular web service.
    Remote { url: String, timeout: Duration },
}

impl ExecutionBackend {
    /// The guard policy matching this backend.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Local { .. } => BackendKind::Local,
            Self::Remote { .. } => BackendKind::Remote,
        }
    }
}

/// One per-component row from a series SELECT.
///
/// Column order is fixed by the planner contract:
/// `mukey, cokey, compname, comppct_r, value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRow {
    pub mukey: String,
    pub cokey: String,
    pub compname: Option<String>,
    pub comppct_r: Option<f64>,
    pub value: Option<f64>,
}

/// Normalized result of one guarded execution.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// mukey -> nullable numeric value, in deterministic key order.
    pub mu_values: BTreeMap<String, Option<f64>>,
    /// Per-component rows, when the plan carried a series SELECT.
    pub components: Option<Vec<ComponentRow>>,
}

impl QueryResult {
    /// Returns true if the series part produced at least one row.
    pub fn has_components(&self) -> bool {
        self.components.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Trait for backend executors.
///
/// Implementations must be thread-safe (Send + Sync); one `ask` owns its
/// executor exclusively, so no internal locking is needed.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// The backend kind this executor serves.
    fn backend(&self) -> BackendKind;

    /// Runs an approved query and normalizes the result.
    async fn run(&self, query: &GuardedQuery) -> Result<QueryResult>;
}

/// Rejects queries approved for a different backend than `expected`.
pub(crate) fn ensure_backend(query: &GuardedQuery, expected: BackendKind) -> Result<()> {
    if query.backend() != expected {
        return Err(SoilqError::validation(format!(
            "query was approved for the {} backend, not {}",
            query.backend(),
            expected
        )));
    }
    Ok(())
}
