//! Command-line argument parsing for soilq.
//!
//! Two modes: `build-kb` prepares the knowledge base, `ask` runs one
//! question through the guarded pipeline. The `-s/--sda` flag selects the
//! remote backend instead of a local SQLite file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{Result, SoilqError};
use crate::materialize::OutputFormat;
use crate::planner::AggMethod;

/// Natural-language queries over the SSURGO soil survey.
#[derive(Parser, Debug)]
#[command(name = "soilq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the knowledge base used for planner context
    BuildKb(BuildKbArgs),
    /// Ask a question and write the result onto a map-unit layer
    Ask(AskArgs),
}

/// Arguments shared by both modes for selecting the backend.
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Path to the SSURGO SQLite database (omit with -s)
    #[arg(long, value_name = "PATH")]
    pub sqlite: Option<PathBuf>,

    /// Use the SDA web service (no local SQLite)
    #[arg(short = 's', long = "sda")]
    pub sda: bool,
}

impl BackendArgs {
    /// Ensures exactly one backend was selected.
    pub fn validate(&self) -> Result<()> {
        match (&self.sqlite, self.sda) {
            (None, false) => Err(SoilqError::config("Provide --sqlite=... or use -s for SDA")),
            (Some(_), true) => Err(SoilqError::config(
                "--sqlite and -s are mutually exclusive",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Args, Debug)]
pub struct BuildKbArgs {
    /// Directory for the snippet index
    #[arg(long, value_name = "DIR")]
    pub kb_dir: PathBuf,

    /// Comma-separated text/markdown documents to ingest
    #[arg(long, value_name = "PATHS", value_delimiter = ',')]
    pub docs: Vec<PathBuf>,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Directory of the snippet index
    #[arg(long, value_name = "DIR")]
    pub kb_dir: PathBuf,

    /// Natural-language question
    #[arg(long, value_name = "TEXT")]
    pub question: String,

    /// Mapunit polygon layer (must have mukey)
    #[arg(long, value_name = "LAYER")]
    pub mapunit: String,

    /// Output artifact name
    #[arg(long, value_name = "NAME")]
    pub output: String,

    /// Output format: vector, raster, or series
    #[arg(long, value_name = "FORMAT", default_value = "vector")]
    pub format: String,

    /// Aggregation override (DCP,DCD,WA,MOM,ML,LL,PP,NAN)
    #[arg(long, value_name = "TOKEN")]
    pub method: Option<String>,

    /// Depth limit in cm (e.g. 100)
    #[arg(long, value_name = "CM")]
    pub depth: Option<u32>,

    #[command(flatten)]
    pub backend: BackendArgs,
}

impl AskArgs {
    /// Parses the output format.
    pub fn parse_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(SoilqError::config)
    }

    /// Parses the aggregation override token, if given.
    pub fn parse_method(&self) -> Result<Option<AggMethod>> {
        self.method
            .as_deref()
            .map(|token| token.parse().map_err(SoilqError::config))
            .transpose()
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
