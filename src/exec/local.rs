//! Local executor over the embedded SSURGO SQLite database.
//!
//! Runs the primary and optional series SELECT on one connection. The
//! first column of the primary SELECT is stringified to form the mapping
//! keys, matching how mukeys are compared against the target layer.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row as SqlxRow;
use tracing::debug;

use crate::error::{Result, SoilqError};
use crate::guard::{split_series, BackendKind, GuardedQuery};

use super::{ensure_backend, ComponentRow, QueryExecutor, QueryResult};

/// Executor for the local SQLite backend.
#[derive(Debug)]
pub struct LocalExecutor {
    pool: SqlitePool,
}

impl LocalExecutor {
    /// Opens the SSURGO database read-only.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(SoilqError::execution(format!(
                "SQLite database not found: {}",
                db_path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                SoilqError::execution(format!(
                    "Failed to open {}: {e}",
                    db_path.display()
                ))
            })?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool (used to build the schema catalog on
    /// the same connection).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<SqliteRow>> {
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SoilqError::execution(format!("Query failed: {e}")))
    }
}

#[async_trait]
impl QueryExecutor for LocalExecutor {
    fn backend(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn run(&self, query: &GuardedQuery) -> Result<QueryResult> {
        ensure_backend(query, BackendKind::Local)?;

        let parts = split_series(query.sql());
        let mut result = QueryResult::default();

        if !parts.primary.is_empty() {
            let rows = self.fetch(parts.primary).await?;
            if let Some(first) = rows.first() {
                let n = first.columns().len();
                if n != 2 {
                    return Err(SoilqError::execution(format!(
                        "primary SELECT must project exactly 2 columns (mukey, value); got {n}"
                    )));
                }
            }
            for row in &rows {
                let Some(key) = cell_text(row, 0)? else {
                    debug!("Dropping primary row with NULL key");
                    continue;
                };
                result.mu_values.insert(key, cell_number(row, 1)?);
            }
        }

        if let Some(series_sql) = parts.series {
            if !series_sql.is_empty() {
                let rows = self.fetch(series_sql).await?;
                if let Some(first) = rows.first() {
                    let n = first.columns().len();
                    if n != 5 {
                        return Err(SoilqError::execution(format!(
                            "series SELECT must project exactly 5 columns \
                             (mukey, cokey, compname, comppct_r, value); got {n}"
                        )));
                    }
                }
                let mut components = Vec::with_capacity(rows.len());
                for row in &rows {
                    components.push(ComponentRow {
                        mukey: cell_text(row, 0)?.unwrap_or_default(),
                        cokey: cell_text(row, 1)?.unwrap_or_default(),
                        compname: cell_text(row, 2)?,
                        comppct_r: cell_number(row, 3)?,
                        value: cell_number(row, 4)?,
                    });
                }
                result.components = Some(components);
            }
        }

        Ok(result)
    }
}

/// Stringifies a cell regardless of its SQLite affinity.
fn cell_text(row: &SqliteRow, idx: usize) -> Result<Option<String>> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map(|x| x.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map(|x| x.to_string()));
    }
    row.try_get::<Option<String>, _>(idx)
        .map_err(|e| SoilqError::execution(format!("Cannot read column {idx} as text: {e}")))
}

/// Reads a cell as a nullable number; unparseable text becomes NULL.
fn cell_number(row: &SqliteRow, idx: usize) -> Result<Option<f64>> {
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map(|x| x as f64));
    }
    match row.try_get::<Option<String>, _>(idx) {
        Ok(v) => Ok(v.and_then(|s| s.trim().parse().ok())),
        Err(e) => Err(SoilqError::execution(format!(
            "Cannot read column {idx} as a number: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::guard;

    /// One shared connection: pooled `:memory:` databases are otherwise
    /// distinct per connection.
    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn seeded_executor() -> (LocalExecutor, SchemaCatalog) {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE mapunit (mukey TEXT PRIMARY KEY, muname TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE component (
                 cokey TEXT PRIMARY KEY,
                 mukey TEXT,
                 compname TEXT,
                 comppct_r REAL,
                 runoff TEXT
             )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO mapunit VALUES ('100', 'Cecil sandy loam'), ('200', 'Appling')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO component VALUES
                 ('100:1', '100', 'Cecil', 60.0, 'Medium'),
                 ('100:2', '100', 'Pacolet', 40.0, 'High'),
                 ('200:1', '200', 'Appling', 85.0, NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let catalog = SchemaCatalog::introspect(&pool).await.unwrap();
        (LocalExecutor::from_pool(pool), catalog)
    }

    #[tokio::test]
    async fn test_primary_select_builds_string_keyed_map() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT component.mukey, SUM(component.comppct_r) \
             FROM component GROUP BY component.mukey",
            &catalog,
        )
        .unwrap();

        let result = exec.run(&q).await.unwrap();
        assert_eq!(result.mu_values.get("100"), Some(&Some(100.0)));
        assert_eq!(result.mu_values.get("200"), Some(&Some(85.0)));
        assert!(result.components.is_none());
    }

    #[tokio::test]
    async fn test_integer_keys_are_stringified() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT CAST(mukey AS INTEGER), 1.5 FROM mapunit",
            &catalog,
        )
        .unwrap();

        let result = exec.run(&q).await.unwrap();
        assert_eq!(result.mu_values.get("100"), Some(&Some(1.5)));
    }

    #[tokio::test]
    async fn test_primary_arity_is_enforced() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT mukey, muname, 1 FROM mapunit",
            &catalog,
        )
        .unwrap();

        let err = exec.run(&q).await.unwrap_err();
        assert!(err.to_string().contains("exactly 2 columns"));
    }

    #[tokio::test]
    async fn test_series_part_yields_component_rows() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT mukey, NULL FROM mapunit\n---SERIES---\n\
             SELECT component.mukey, component.cokey, component.compname, \
             component.comppct_r, NULL FROM component ORDER BY component.cokey",
            &catalog,
        )
        .unwrap();

        let result = exec.run(&q).await.unwrap();
        let components = result.components.unwrap();
        assert_eq!(components.len(), 3);
        assert_eq!(components[0].mukey, "100");
        assert_eq!(components[0].cokey, "100:1");
        assert_eq!(components[0].compname.as_deref(), Some("Cecil"));
        assert_eq!(components[0].comppct_r, Some(60.0));
        assert_eq!(components[0].value, None);
    }

    #[tokio::test]
    async fn test_series_arity_is_enforced() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT mukey, NULL FROM mapunit\n---SERIES---\n\
             SELECT mukey, cokey FROM component",
            &catalog,
        )
        .unwrap();

        let err = exec.run(&q).await.unwrap_err();
        assert!(err.to_string().contains("exactly 5 columns"));
    }

    #[tokio::test]
    async fn test_null_values_survive_as_none() {
        let (exec, catalog) = seeded_executor().await;
        let q = guard::local::validate(
            "SELECT mukey, NULL FROM mapunit",
            &catalog,
        )
        .unwrap();

        let result = exec.run(&q).await.unwrap();
        assert_eq!(result.mu_values.get("100"), Some(&None));
    }

    #[tokio::test]
    async fn test_sql_error_is_execution_error() {
        let (exec, catalog) = seeded_executor().await;
        // Valid per the lexical guard, invalid SQL at execution time.
        let q = guard::local::validate(
            "SELECT mukey FROM mapunit WHERE",
            &catalog,
        )
        .unwrap();

        let err = exec.run(&q).await.unwrap_err();
        assert_eq!(err.category(), "Execution Error");
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let err = LocalExecutor::open(Path::new("/nonexistent/ssurgo.db"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Execution Error");
    }
}
