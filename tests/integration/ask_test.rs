//! End-to-end asks: mock planner, seeded SQLite, in-memory layer store.

use soilq::ask::{AskContext, AskRequest};
use soilq::catalog::SchemaCatalog;
use soilq::exec::LocalExecutor;
use soilq::kb::{Snippet, StaticKb};
use soilq::layer::MemoryStore;
use soilq::materialize::OutputFormat;
use soilq::planner::MockPlanner;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

async fn seeded_local() -> (LocalExecutor, SchemaCatalog) {
    // One shared connection: pooled `:memory:` databases are otherwise
    // distinct per connection.
    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("CREATE TABLE mapunit (mukey TEXT PRIMARY KEY, muname TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE component (
             cokey TEXT PRIMARY KEY,
             mukey TEXT,
             compname TEXT,
             comppct_r REAL
         )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO mapunit VALUES ('100', 'Cecil'), ('200', 'Appling')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO component VALUES
             ('100:1', '100', 'Cecil', 60.0),
             ('100:2', '100', 'Pacolet', 40.0),
             ('200:1', '200', 'Appling', 85.0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let catalog = SchemaCatalog::introspect(&pool).await.unwrap();
    (LocalExecutor::from_pool(pool), catalog)
}

fn request(format: OutputFormat, output: &str) -> AskRequest {
    AskRequest {
        question: "component percentages".to_string(),
        mapunit: "soils".to_string(),
        output: output.to_string(),
        format,
        method: None,
        depth_cm: None,
    }
}

#[tokio::test]
async fn test_ask_to_raster_end_to_end() {
    let (executor, catalog) = seeded_local().await;
    let store = MemoryStore::new().with_layer("soils", &["100", "200", "999"]);
    let planner = MockPlanner::returning(
        "SELECT component.mukey, SUM(component.comppct_r) \
         FROM component GROUP BY component.mukey",
    );
    let kb = StaticKb::new(vec![Snippet {
        source: "docs".into(),
        text: "comppct_r is the representative component percent.".into(),
    }]);

    let ctx = AskContext {
        planner: &planner,
        kb: &kb,
        store: &store,
        executor: &executor,
        catalog: Some(&catalog),
    };

    let outcome = ctx.ask(&request(OutputFormat::Raster, "pct")).await.unwrap();
    assert_eq!(outcome.format, OutputFormat::Raster);

    let raster = store.raster("pct").unwrap();
    assert_eq!(raster.get("100"), Some(&100.0));
    assert_eq!(raster.get("200"), Some(&85.0));
    // Layer features with no matching result key stay unset.
    assert_eq!(raster.get("999"), None);
    // Temporary vector removed.
    assert!(store.vector("pct_tmpv").is_none());
}

#[tokio::test]
async fn test_ask_series_end_to_end() {
    let (executor, catalog) = seeded_local().await;
    let store = MemoryStore::new().with_layer("soils", &["100", "200"]);
    let planner = MockPlanner::returning(
        "SELECT mukey, NULL FROM mapunit\n---SERIES---\n\
         SELECT component.mukey, component.cokey, component.compname, \
         component.comppct_r, NULL FROM component ORDER BY component.cokey",
    );
    let kb = StaticKb::empty();

    let ctx = AskContext {
        planner: &planner,
        kb: &kb,
        store: &store,
        executor: &executor,
        catalog: Some(&catalog),
    };

    ctx.ask(&request(OutputFormat::Series, "series_out"))
        .await
        .unwrap();

    let csv = store.imported_table("series_out").unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "mukey,cokey,compname,comppct_r,value");
    assert_eq!(lines.len(), 4); // header + three components
    assert!(lines[1].starts_with("100,100:1,Cecil,60,"));
}

#[tokio::test]
async fn test_ask_fails_fast_on_planner_error() {
    let (executor, catalog) = seeded_local().await;
    let store = MemoryStore::new().with_layer("soils", &["100"]);
    let planner = MockPlanner::failing();
    let kb = StaticKb::empty();

    let ctx = AskContext {
        planner: &planner,
        kb: &kb,
        store: &store,
        executor: &executor,
        catalog: Some(&catalog),
    };

    let err = ctx
        .ask(&request(OutputFormat::Vector, "out"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Planner Error");
    // Nothing was written.
    assert!(store.vector("out").is_none());
}

#[tokio::test]
async fn test_ask_rejects_plan_referencing_unknown_column() {
    let (executor, catalog) = seeded_local().await;
    let store = MemoryStore::new().with_layer("soils", &["100"]);
    let planner = MockPlanner::returning("SELECT component.bogus, 1 FROM component");
    let kb = StaticKb::empty();

    let ctx = AskContext {
        planner: &planner,
        kb: &kb,
        store: &store,
        executor: &executor,
        catalog: Some(&catalog),
    };

    let err = ctx
        .ask(&request(OutputFormat::Vector, "out"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown column component.bogus"));
    assert!(store.vector("out").is_none());
}
