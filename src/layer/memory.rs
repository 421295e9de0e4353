//! In-memory layer store for testing.
//!
//! Models just enough of a vector/raster store to exercise the
//! materializer: named polygon layers whose features carry a mukey and a
//! map of attribute values, plus rasters recorded as per-mukey cell
//! values.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SoilqError};

use super::LayerStore;

/// A single polygon feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    /// Map-unit key; several features may share one.
    pub mukey: String,
    /// Attribute values by column name.
    pub values: BTreeMap<String, f64>,
}

/// An in-memory vector layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorLayer {
    /// Attribute columns present on the layer.
    pub columns: BTreeSet<String>,
    /// Polygon features.
    pub features: Vec<Feature>,
}

#[derive(Debug, Default)]
struct State {
    vectors: BTreeMap<String, VectorLayer>,
    /// Raster name -> mukey -> cell value.
    rasters: BTreeMap<String, BTreeMap<String, f64>>,
    /// Imported table name -> CSV text.
    tables: BTreeMap<String, String>,
}

/// In-memory [`LayerStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a polygon layer with a `mukey` column and one feature per
    /// entry in `mukeys` (repeat a key for multi-polygon map units).
    pub fn with_layer(self, name: &str, mukeys: &[&str]) -> Self {
        {
            let mut state = self.state.lock().expect("store lock");
            let layer = VectorLayer {
                columns: BTreeSet::from(["mukey".to_string()]),
                features: mukeys
                    .iter()
                    .map(|mukey| Feature {
                        mukey: (*mukey).to_string(),
                        values: BTreeMap::new(),
                    })
                    .collect(),
            };
            state.vectors.insert(name.to_string(), layer);
        }
        self
    }

    /// Adds a polygon layer without a `mukey` column.
    pub fn with_keyless_layer(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().expect("store lock");
            state.vectors.insert(name.to_string(), VectorLayer::default());
        }
        self
    }

    /// Returns a snapshot of a vector layer.
    pub fn vector(&self, name: &str) -> Option<VectorLayer> {
        self.state.lock().expect("store lock").vectors.get(name).cloned()
    }

    /// Returns a snapshot of a raster's per-mukey cell values.
    pub fn raster(&self, name: &str) -> Option<BTreeMap<String, f64>> {
        self.state.lock().expect("store lock").rasters.get(name).cloned()
    }

    /// Returns the CSV text of an imported table artifact.
    pub fn imported_table(&self, name: &str) -> Option<String> {
        self.state.lock().expect("store lock").tables.get(name).cloned()
    }
}

#[async_trait]
impl LayerStore for MemoryStore {
    async fn has_column(&self, layer: &str, column: &str) -> Result<bool> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .vectors
            .get(layer)
            .is_some_and(|l| l.columns.contains(column)))
    }

    async fn copy_vector(&self, src: &str, dst: &str) -> Result<()> {
        let mut state = self.state.lock().expect("store lock");
        let layer = state
            .vectors
            .get(src)
            .cloned()
            .ok_or_else(|| SoilqError::materialization(format!("vector <{src}> not found")))?;
        state.vectors.insert(dst.to_string(), layer);
        Ok(())
    }

    async fn add_column(&self, layer: &str, column: &str) -> Result<()> {
        let mut state = self.state.lock().expect("store lock");
        let layer = state
            .vectors
            .get_mut(layer)
            .ok_or_else(|| SoilqError::materialization(format!("vector <{layer}> not found")))?;
        layer.columns.insert(column.to_string());
        Ok(())
    }

    async fn update_attribute(
        &self,
        layer: &str,
        column: &str,
        value: f64,
        mukey: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("store lock");
        let layer = state
            .vectors
            .get_mut(layer)
            .ok_or_else(|| SoilqError::materialization(format!("vector <{layer}> not found")))?;
        if !layer.columns.contains(column) {
            return Err(SoilqError::materialization(format!(
                "column <{column}> not found"
            )));
        }
        for feature in layer.features.iter_mut().filter(|f| f.mukey == mukey) {
            feature.values.insert(column.to_string(), value);
        }
        Ok(())
    }

    async fn rasterize(&self, vector: &str, raster: &str, column: &str) -> Result<()> {
        let mut state = self.state.lock().expect("store lock");
        let layer = state
            .vectors
            .get(vector)
            .ok_or_else(|| SoilqError::materialization(format!("vector <{vector}> not found")))?;
        let cells: BTreeMap<String, f64> = layer
            .features
            .iter()
            .filter_map(|f| {
                f.values
                    .get(column)
                    .map(|v| (f.mukey.clone(), *v))
            })
            .collect();
        state.rasters.insert(raster.to_string(), cells);
        Ok(())
    }

    async fn remove_vector(&self, layer: &str) -> Result<()> {
        let mut state = self.state.lock().expect("store lock");
        state
            .vectors
            .remove(layer)
            .ok_or_else(|| SoilqError::materialization(format!("vector <{layer}> not found")))?;
        Ok(())
    }

    async fn import_table(&self, csv_path: &Path, output: &str) -> Result<()> {
        let text = std::fs::read_to_string(csv_path).map_err(|e| {
            SoilqError::materialization(format!(
                "cannot read {}: {e}",
                csv_path.display()
            ))
        })?;
        let mut state = self.state.lock().expect("store lock");
        state.tables.insert(output.to_string(), text);
        Ok(())
    }
}
