//! Geospatial layer store abstraction.
//!
//! The pipeline never touches GIS data directly; it drives a small set of
//! primitives (copy, add-column, update-where, rasterize, remove, import)
//! keyed by layer name. `GrassStore` implements them by invoking GRASS
//! modules; `MemoryStore` is the in-memory double used by tests.

mod grass;
mod memory;

pub use grass::GrassStore;
pub use memory::{Feature, MemoryStore, VectorLayer};

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the layer-store primitives the materializer needs.
///
/// All operations are keyed by layer name. Implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait LayerStore: Send + Sync {
    /// Returns true if the named vector layer carries the given attribute
    /// column.
    async fn has_column(&self, layer: &str, column: &str) -> Result<bool>;

    /// Copies a vector layer under a new name, replacing any existing
    /// layer of that name.
    async fn copy_vector(&self, src: &str, dst: &str) -> Result<()>;

    /// Adds a double-precision attribute column. Succeeds when the column
    /// already exists.
    async fn add_column(&self, layer: &str, column: &str) -> Result<()>;

    /// Sets `column = value` on every feature whose `mukey` attribute
    /// equals `mukey` (exact string match). Zero matching features is not
    /// an error.
    async fn update_attribute(
        &self,
        layer: &str,
        column: &str,
        value: f64,
        mukey: &str,
    ) -> Result<()>;

    /// Rasterizes a vector layer using the given attribute column as the
    /// cell value.
    async fn rasterize(&self, vector: &str, raster: &str, column: &str) -> Result<()>;

    /// Deletes a vector layer.
    async fn remove_vector(&self, layer: &str) -> Result<()>;

    /// Imports a CSV file as a named attribute table artifact.
    async fn import_table(&self, csv_path: &Path, output: &str) -> Result<()>;
}
