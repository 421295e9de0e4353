//! GRASS-backed layer store.
//!
//! Drives the GRASS GIS modules the pipeline needs through subprocesses.
//! Must run inside a GRASS session (the modules resolve the current
//! location/mapset from the environment).

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, SoilqError};

use super::LayerStore;

/// [`LayerStore`] implementation backed by GRASS modules.
#[derive(Debug, Clone, Default)]
pub struct GrassStore;

impl GrassStore {
    /// Creates a store; callers are responsible for running inside a
    /// GRASS session.
    pub fn new() -> Self {
        Self
    }

    async fn run_module(&self, program: &str, args: &[String]) -> Result<String> {
        debug!("Running {program} {}", args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SoilqError::materialization(format!("failed to spawn {program}: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SoilqError::materialization(format!(
                "{program} failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl LayerStore for GrassStore {
    async fn has_column(&self, layer: &str, column: &str) -> Result<bool> {
        // v.db.select fails when the column does not exist.
        let args = vec![
            format!("map={layer}"),
            format!("columns={column}"),
            "layer=1".to_string(),
            "-c".to_string(),
        ];
        match self.run_module("v.db.select", &args).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("has_column({layer}, {column}): {e}");
                Ok(false)
            }
        }
    }

    async fn copy_vector(&self, src: &str, dst: &str) -> Result<()> {
        self.run_module(
            "g.copy",
            &[format!("vector={src},{dst}"), "--overwrite".to_string()],
        )
        .await
        .map(drop)
    }

    async fn add_column(&self, layer: &str, column: &str) -> Result<()> {
        let args = vec![
            format!("map={layer}"),
            format!("columns={column} double precision"),
        ];
        // Tolerate "already exists": re-materializing onto an existing
        // output must not fail here.
        if let Err(e) = self.run_module("v.db.addcolumn", &args).await {
            warn!("v.db.addcolumn on {layer}: {e}");
        }
        Ok(())
    }

    async fn update_attribute(
        &self,
        layer: &str,
        column: &str,
        value: f64,
        mukey: &str,
    ) -> Result<()> {
        let escaped = mukey.replace('\'', "''");
        self.run_module(
            "v.db.update",
            &[
                format!("map={layer}"),
                format!("column={column}"),
                format!("value={value}"),
                format!("where=mukey='{escaped}'"),
            ],
        )
        .await
        .map(drop)
    }

    async fn rasterize(&self, vector: &str, raster: &str, column: &str) -> Result<()> {
        self.run_module(
            "v.to.rast",
            &[
                format!("input={vector}"),
                format!("output={raster}"),
                "use=attr".to_string(),
                format!("attribute_column={column}"),
                "--overwrite".to_string(),
            ],
        )
        .await
        .map(drop)
    }

    async fn remove_vector(&self, layer: &str) -> Result<()> {
        self.run_module(
            "g.remove",
            &[
                "type=vector".to_string(),
                format!("name={layer}"),
                "-f".to_string(),
            ],
        )
        .await
        .map(drop)
    }

    async fn import_table(&self, csv_path: &Path, output: &str) -> Result<()> {
        self.run_module(
            "db.in.ogr",
            &[
                format!("input={}", csv_path.display()),
                format!("output={output}"),
                "--overwrite".to_string(),
            ],
        )
        .await
        .map(drop)
    }
}
