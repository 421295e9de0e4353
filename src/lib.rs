//! soilq - natural-language queries over the SSURGO soil survey.
//!
//! A question is planned into SQL, proven safe by a backend-specific
//! guard, executed against local SQLite or the SDA web service, and the
//! per-map-unit result is materialized as a vector attribute, a raster,
//! or a tabular series.

pub mod ask;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod guard;
pub mod kb;
pub mod layer;
pub mod materialize;
pub mod planner;
