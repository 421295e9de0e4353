//! Fixture SQL encoding the aggregation conventions the planner must
//! follow: depth-weighted means over a horizon window, and dominant
//! component selection. The executor itself stays aggregation-agnostic;
//! these tests pin the conventions end to end against a seeded database.

use soilq::catalog::SchemaCatalog;
use soilq::exec::{LocalExecutor, QueryExecutor};
use soilq::guard::local;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

async fn seeded() -> (LocalExecutor, SchemaCatalog) {
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
             comppct_r REAL,
             ksat_r REAL
         )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE chorizon (
             chkey TEXT PRIMARY KEY,
             cokey TEXT,
             hzdept_r REAL,
             hzdepb_r REAL,
             ksat_r REAL
         )",
    )
    .execute(&pool)
    .await
    .unwrap();

    // mukey 1: one full-percent component with two horizons for the
    // depth-weighted fixture. mukey 2: a zero-thickness horizon to pin
    // the null guard. mukey 3: two components for the dominant fixture.
    sqlx::query("INSERT INTO mapunit VALUES ('1', 'A'), ('2', 'B'), ('3', 'C')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO component VALUES
             ('1:1', '1', 'Cecil', 100.0, NULL),
             ('2:1', '2', 'Appling', 100.0, NULL),
             ('3:1', '3', 'Georgeville', 60.0, 10.0),
             ('3:2', '3', 'Herndon', 40.0, 99.0)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO chorizon VALUES
             ('1:1:1', '1:1', 0.0, 20.0, 10.0),
             ('1:1:2', '1:1', 20.0, 40.0, 30.0),
             ('2:1:1', '2:1', 0.0, 0.0, 99.0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let catalog = SchemaCatalog::introspect(&pool).await.unwrap();
    (LocalExecutor::from_pool(pool), catalog)
}

/// Depth-weighted SQL over the window [0, 30], in the shape the planner
/// is taught to produce.
const WEIGHTED_KSAT_TO_30CM: &str = "WITH hz AS (
  SELECT mu.mukey, co.cokey, co.comppct_r,
         MAX(0, MIN(ch.hzdepb_r, 30) - MAX(ch.hzdept_r, 0)) AS thk, ch.ksat_r
  FROM mapunit mu JOIN component co USING(mukey) JOIN chorizon ch USING(cokey)
  WHERE ch.hzdept_r < 30
),
co_agg AS (
  SELECT mukey, cokey, SUM(ksat_r*thk)/NULLIF(SUM(thk),0) AS comp_val
  FROM hz GROUP BY mukey, cokey
),
mu_agg AS (
  SELECT co.mukey,
         SUM(comp_val*(co.comppct_r/100.0))/NULLIF(SUM(co.comppct_r/100.0),0) AS value
  FROM co_agg JOIN component co USING(mukey, cokey) GROUP BY co.mukey
)
SELECT mukey, value FROM mu_agg";

/// Dominant-component SQL: per mukey, only the highest-percent component,
/// ties broken by cokey.
const DOMINANT_KSAT: &str = "SELECT c.mukey, c.ksat_r FROM component c
WHERE c.ksat_r IS NOT NULL
  AND c.cokey = (
    SELECT c2.cokey FROM component c2
    WHERE c2.mukey = c.mukey
    ORDER BY c2.comppct_r DESC, c2.cokey ASC
    LIMIT 1
  )";

#[tokio::test]
async fn test_depth_weighted_mean_over_window() {
    let (exec, catalog) = seeded().await;
    let q = local::validate(WEIGHTED_KSAT_TO_30CM, &catalog).unwrap();
    let result = exec.run(&q).await.unwrap();

    // Horizon 0-20 contributes 20 cm of ksat 10; horizon 20-40 contributes
    // 10 cm of ksat 30 inside the window: (20*10 + 10*30)/30 = 16.67.
    let value = result.mu_values["1"].unwrap();
    assert!((value - 50.0 / 3.0).abs() < 1e-9, "got {value}");
    assert!((value - 16.67).abs() < 0.01);
}

#[tokio::test]
async fn test_zero_thickness_yields_null_not_zero() {
    let (exec, catalog) = seeded().await;
    let q = local::validate(WEIGHTED_KSAT_TO_30CM, &catalog).unwrap();
    let result = exec.run(&q).await.unwrap();

    // mukey 2's only horizon has zero thickness; the NULLIF guard must
    // produce NULL, never a division by zero or a spurious 0.
    assert_eq!(result.mu_values.get("2"), Some(&None));
}

#[tokio::test]
async fn test_dominant_component_uses_highest_percent_only() {
    let (exec, catalog) = seeded().await;
    let q = local::validate(DOMINANT_KSAT, &catalog).unwrap();
    let result = exec.run(&q).await.unwrap();

    // 60% Georgeville (10.0) wins over 40% Herndon (99.0); values are
    // never blended.
    assert_eq!(result.mu_values.get("3"), Some(&Some(10.0)));
}

#[tokio::test]
async fn test_dominant_component_breaks_ties_by_cokey() {
    let (exec, catalog) = seeded().await;
    sqlx::query(
        "INSERT INTO mapunit VALUES ('4', 'D')",
    )
    .execute(exec.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO component VALUES
             ('4:1', '4', 'Tied A', 50.0, 1.0),
             ('4:2', '4', 'Tied B', 50.0, 2.0)",
    )
    .execute(exec.pool())
    .await
    .unwrap();

    let q = local::validate(DOMINANT_KSAT, &catalog).unwrap();
    let result = exec.run(&q).await.unwrap();
    assert_eq!(result.mu_values.get("4"), Some(&Some(1.0)));
}
