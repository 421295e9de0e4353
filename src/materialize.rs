//! Materialization of query results onto the map-unit layer.
//!
//! Turns a mukey -> value mapping (and optional per-component rows) into
//! the caller's chosen artifact: an updated vector layer, a rasterized
//! layer, or a tabular series. Result keys with no matching feature are
//! skipped silently — the one intentional silent path in the pipeline.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Result, SoilqError};
use crate::exec::{ComponentRow, QueryResult};
use crate::layer::LayerStore;

/// Attribute column written to vector outputs and used for rasterization.
pub const RESULT_COLUMN: &str = "value";

/// Fixed column order of the series artifact.
pub const SERIES_COLUMNS: [&str; 5] = ["mukey", "cokey", "compname", "comppct_r", "value"];

/// The artifact shape requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Copy of the map-unit layer with the result column filled in.
    Vector,
    /// Polygon-to-raster conversion of the result column.
    Raster,
    /// Per-component rows written as an attribute table.
    Series,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "raster" => Ok(Self::Raster),
            "series" => Ok(Self::Series),
            _ => Err(format!(
                "Invalid format: {s}. Expected: vector, raster, or series"
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Raster => write!(f, "raster"),
            Self::Series => write!(f, "series"),
        }
    }
}

/// Writes query results into the layer store.
pub struct Materializer<'a> {
    store: &'a dyn LayerStore,
}

impl<'a> Materializer<'a> {
    /// Creates a materializer over the given store.
    pub fn new(store: &'a dyn LayerStore) -> Self {
        Self { store }
    }

    /// Writes the result as the requested artifact named `output`,
    /// projecting onto the `mapunit` polygon layer.
    pub async fn materialize(
        &self,
        format: OutputFormat,
        mapunit: &str,
        output: &str,
        result: &QueryResult,
    ) -> Result<()> {
        match format {
            OutputFormat::Vector => self.to_vector(mapunit, output, result).await,
            OutputFormat::Raster => self.to_raster(mapunit, output, result).await,
            OutputFormat::Series => self.to_series(output, result.components.as_deref()).await,
        }
    }

    async fn to_vector(&self, mapunit: &str, output: &str, result: &QueryResult) -> Result<()> {
        self.store.copy_vector(mapunit, output).await?;
        self.apply_values(output, result).await?;
        info!("Wrote vector <{output}>");
        Ok(())
    }

    async fn to_raster(&self, mapunit: &str, output: &str, result: &QueryResult) -> Result<()> {
        let tmpv = format!("{output}_tmpv");
        self.store.copy_vector(mapunit, &tmpv).await?;
        self.apply_values(&tmpv, result).await?;
        self.store.rasterize(&tmpv, output, RESULT_COLUMN).await?;
        self.store.remove_vector(&tmpv).await?;
        info!("Wrote raster <{output}>");
        Ok(())
    }

    async fn to_series(&self, output: &str, components: Option<&[ComponentRow]>) -> Result<()> {
        let rows = match components {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                return Err(SoilqError::materialization(
                    "this query didn't produce per-component rows; \
                     try a series-oriented question (e.g. 'soil series')",
                ))
            }
        };

        let csv_path = series_csv_path(output);
        write_series_csv(&csv_path, rows)?;
        self.store.import_table(&csv_path, output).await?;
        info!("Wrote series <{output}> ({} rows)", rows.len());
        Ok(())
    }

    /// Ensures the result column exists and sets it for every mukey with a
    /// present value. One update per key; keys without matching features
    /// are dropped silently.
    async fn apply_values(&self, layer: &str, result: &QueryResult) -> Result<()> {
        if !self.store.has_column(layer, RESULT_COLUMN).await? {
            self.store.add_column(layer, RESULT_COLUMN).await?;
        }
        let mut written = 0usize;
        for (mukey, value) in &result.mu_values {
            let Some(value) = value else {
                debug!("Skipping mukey {mukey}: NULL value");
                continue;
            };
            self.store
                .update_attribute(layer, RESULT_COLUMN, *value, mukey)
                .await?;
            written += 1;
        }
        debug!("Updated {written} map units on <{layer}>");
        Ok(())
    }
}

fn series_csv_path(output: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{output}.csv"))
}

fn write_series_csv(path: &PathBuf, rows: &[ComponentRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| SoilqError::materialization(format!("cannot create {}: {e}", path.display())))?;

    writer
        .write_record(SERIES_COLUMNS)
        .map_err(|e| SoilqError::materialization(format!("csv write failed: {e}")))?;

    for row in rows {
        let record = [
            row.mukey.clone(),
            row.cokey.clone(),
            row.compname.clone().unwrap_or_default(),
            row.comppct_r.map(|v| v.to_string()).unwrap_or_default(),
            row.value.map(|v| v.to_string()).unwrap_or_default(),
        ];
        writer
            .write_record(&record)
            .map_err(|e| SoilqError::materialization(format!("csv write failed: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| SoilqError::materialization(format!("csv flush failed: {e}")))?;
    Ok(())
}
