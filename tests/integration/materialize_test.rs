//! Materializer properties over the in-memory layer store.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use soilq::exec::{ComponentRow, QueryResult};
use soilq::layer::MemoryStore;
use soilq::materialize::{Materializer, OutputFormat, RESULT_COLUMN};

fn result_with(values: &[(&str, Option<f64>)]) -> QueryResult {
    QueryResult {
        mu_values: values
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
        components: None,
    }
}

#[tokio::test]
async fn test_vector_with_unmatched_mukey_updates_nothing_and_succeeds() {
    let store = MemoryStore::new().with_layer("soils", &["100", "200"]);
    let result = result_with(&[("123", Some(5.0))]);

    Materializer::new(&store)
        .materialize(OutputFormat::Vector, "soils", "out", &result)
        .await
        .unwrap();

    let out = store.vector("out").unwrap();
    assert!(out.features.iter().all(|f| f.values.is_empty()));
    // The result column is still added to the copy.
    assert!(out.columns.contains(RESULT_COLUMN));
}

#[tokio::test]
async fn test_series_with_empty_components_is_fatal() {
    let store = MemoryStore::new().with_layer("soils", &["100"]);
    let result = QueryResult {
        mu_values: BTreeMap::new(),
        components: Some(vec![]),
    };

    let err = Materializer::new(&store)
        .materialize(OutputFormat::Series, "soils", "out", &result)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Materialization Error");
}

#[tokio::test]
async fn test_vector_and_raster_carry_identical_per_mukey_values() {
    let store = MemoryStore::new().with_layer("soils", &["100", "100", "200", "300"]);
    let result = result_with(&[("100", Some(0.5)), ("200", Some(12.0)), ("300", None)]);
    let materializer = Materializer::new(&store);

    materializer
        .materialize(OutputFormat::Vector, "soils", "as_vector", &result)
        .await
        .unwrap();
    materializer
        .materialize(OutputFormat::Raster, "soils", "as_raster", &result)
        .await
        .unwrap();

    let vector = store.vector("as_vector").unwrap();
    let raster = store.raster("as_raster").unwrap();

    let vector_values: BTreeMap<String, f64> = vector
        .features
        .iter()
        .filter_map(|f| {
            f.values
                .get(RESULT_COLUMN)
                .map(|v| (f.mukey.clone(), *v))
        })
        .collect();
    assert_eq!(vector_values, raster);

    // The raster path cleans up its temporary vector copy.
    assert!(store.vector("as_raster_tmpv").is_none());
}

#[tokio::test]
async fn test_series_artifact_preserves_row_order_and_columns() {
    let store = MemoryStore::new().with_layer("soils", &["100"]);
    let result = QueryResult {
        mu_values: BTreeMap::new(),
        components: Some(vec![
            ComponentRow {
                mukey: "200".into(),
                cokey: "200:9".into(),
                compname: Some("Pacolet".into()),
                comppct_r: Some(35.0),
                value: Some(2.5),
            },
            ComponentRow {
                mukey: "100".into(),
                cokey: "100:1".into(),
                compname: Some("Cecil".into()),
                comppct_r: Some(60.0),
                value: None,
            },
        ]),
    };

    Materializer::new(&store)
        .materialize(OutputFormat::Series, "soils", "series", &result)
        .await
        .unwrap();

    let csv = store.imported_table("series").unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "mukey,cokey,compname,comppct_r,value",
            "200,200:9,Pacolet,35,2.5",
            "100,100:1,Cecil,60,",
        ]
    );
}

#[tokio::test]
async fn test_rematerializing_onto_existing_output_succeeds() {
    let store = MemoryStore::new().with_layer("soils", &["100"]);
    let materializer = Materializer::new(&store);

    let first = result_with(&[("100", Some(1.0))]);
    materializer
        .materialize(OutputFormat::Vector, "soils", "out", &first)
        .await
        .unwrap();

    // Second run copies over the previous output and re-adds the column.
    let second = result_with(&[("100", Some(2.0))]);
    materializer
        .materialize(OutputFormat::Vector, "soils", "out", &second)
        .await
        .unwrap();

    let out = store.vector("out").unwrap();
    assert_eq!(out.features[0].values.get(RESULT_COLUMN), Some(&2.0));
}
