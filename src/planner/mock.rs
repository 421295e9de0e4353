//! Mock planner for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SoilqError};

use super::{PlanRequest, SqlPlanner};

/// A planner that returns a canned SQL string and records what it was
/// asked.
#[derive(Debug, Default)]
pub struct MockPlanner {
    sql: Option<String>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl MockPlanner {
    /// Creates a mock that always returns the given SQL.
    pub fn returning(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that always fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Returns the requests seen so far.
    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl SqlPlanner for MockPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<String> {
        self.requests.lock().expect("mock lock").push(request.clone());
        self.sql
            .clone()
            .ok_or_else(|| SoilqError::planner("mock planner configured to fail"))
    }
}
