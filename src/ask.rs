//! The `ask` flow: one question in, one artifact out.
//!
//! Wires the collaborators together in a fixed order: pre-flight layer
//! check, context retrieval, planning, guard validation, execution,
//! materialization. All-or-nothing: any failure aborts the ask and is
//! reported to the caller.

use tracing::info;

use crate::catalog::{SchemaCatalog, SDA_SCHEMA_TEXT};
use crate::error::{Result, SoilqError};
use crate::exec::{QueryExecutor, QueryResult};
use crate::guard::{self, BackendKind, GuardedQuery};
use crate::kb::KnowledgeBase;
use crate::layer::LayerStore;
use crate::materialize::{Materializer, OutputFormat};
use crate::planner::{AggMethod, PlanRequest, SqlPlanner};

/// How many knowledge-base snippets to hand the planner.
const CONTEXT_SNIPPETS: usize = 6;

/// One natural-language question and its output target.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// The question to answer.
    pub question: String,
    /// Map-unit polygon layer to project onto (must carry `mukey`).
    pub mapunit: String,
    /// Name of the artifact to write.
    pub output: String,
    /// Artifact shape.
    pub format: OutputFormat,
    /// Aggregation override token, if any.
    pub method: Option<AggMethod>,
    /// Depth window bottom in centimeters, if any.
    pub depth_cm: Option<u32>,
}

/// What an `ask` produced.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// The SQL that was executed.
    pub sql: String,
    /// The artifact shape written.
    pub format: OutputFormat,
    /// The artifact name.
    pub output: String,
}

/// Everything one `ask` invocation needs.
///
/// Constructed once per invocation and passed explicitly; there is no
/// process-wide session state.
pub struct AskContext<'a> {
    /// SQL planner (external collaborator).
    pub planner: &'a dyn SqlPlanner,
    /// Knowledge base for retrieval context.
    pub kb: &'a dyn KnowledgeBase,
    /// Geospatial layer store.
    pub store: &'a dyn LayerStore,
    /// Backend executor; its kind selects the guard policy.
    pub executor: &'a dyn QueryExecutor,
    /// Live schema catalog; required for the local backend.
    pub catalog: Option<&'a SchemaCatalog>,
}

impl AskContext<'_> {
    /// Runs the full ask flow and writes the artifact.
    pub async fn ask(&self, request: &AskRequest) -> Result<AskOutcome> {
        // Pre-flight: a layer without mukey can never receive the result.
        if !self.store.has_column(&request.mapunit, "mukey").await? {
            return Err(SoilqError::schema(format!(
                "Mapunit layer <{}> must have a 'mukey' column",
                request.mapunit
            )));
        }

        let sql = self.plan(request).await?;
        let guarded = self.validate(&sql)?;
        info!("Approved SQL for {} backend:\n{}", guarded.backend(), sql);

        let result = self.executor.run(&guarded).await?;
        self.write(request, &result).await?;

        Ok(AskOutcome {
            sql,
            format: request.format,
            output: request.output.clone(),
        })
    }

    async fn plan(&self, request: &AskRequest) -> Result<String> {
        let context = self.kb.search(&request.question, CONTEXT_SNIPPETS)?;
        let schema_text = match self.catalog {
            Some(catalog) => catalog.format_for_planner(),
            None => SDA_SCHEMA_TEXT.to_string(),
        };

        let plan_request = PlanRequest {
            question: request.question.clone(),
            schema_text,
            context,
            method: request.method,
            depth_cm: request.depth_cm,
        };
        self.planner.plan(&plan_request).await
    }

    fn validate(&self, sql: &str) -> Result<GuardedQuery> {
        match self.executor.backend() {
            BackendKind::Local => {
                let catalog = self.catalog.ok_or_else(|| {
                    SoilqError::internal("local backend requires a schema catalog")
                })?;
                guard::local::validate(sql, catalog)
            }
            BackendKind::Remote => guard::remote::validate(sql),
        }
    }

    async fn write(&self, request: &AskRequest, result: &QueryResult) -> Result<()> {
        Materializer::new(self.store)
            .materialize(request.format, &request.mapunit, &request.output, result)
            .await
    }
}
