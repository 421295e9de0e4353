//! soilq - natural-language queries over the SSURGO soil survey.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use soilq::ask::{AskContext, AskRequest};
use soilq::catalog::{SchemaCatalog, SDA_SCHEMA_TEXT};
use soilq::cli::{AskArgs, BuildKbArgs, Cli, Command};
use soilq::config::Config;
use soilq::error::Result;
use soilq::exec::{ExecutionBackend, LocalExecutor, QueryExecutor, RemoteExecutor};
use soilq::kb::FileKb;
use soilq::layer::GrassStore;
use soilq::planner::{OpenAiPlanner, OpenAiPlannerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let config = Config::load_from_file(&cli.config_path())?;

    match cli.command {
        Command::BuildKb(args) => build_kb(&args, &config).await,
        Command::Ask(args) => ask(&args, &config).await,
    }
}

async fn build_kb(args: &BuildKbArgs, _config: &Config) -> Result<()> {
    args.backend.validate()?;

    let schema_text = match &args.backend.sqlite {
        Some(db_path) => {
            let executor = LocalExecutor::open(db_path).await?;
            SchemaCatalog::introspect(executor.pool())
                .await?
                .format_for_planner()
        }
        None => SDA_SCHEMA_TEXT.to_string(),
    };

    let count = FileKb::build(&args.kb_dir, &args.docs, &schema_text)?;
    info!("KB built at {} ({count} snippets)", args.kb_dir.display());
    println!("KB built at {}", args.kb_dir.display());
    Ok(())
}

async fn ask(args: &AskArgs, config: &Config) -> Result<()> {
    args.backend.validate()?;
    let format = args.parse_format()?;
    let method = args.parse_method()?;

    let kb = FileKb::open(&args.kb_dir)?;
    let store = GrassStore::new();

    let mut planner_config =
        OpenAiPlannerConfig::new(planner_api_key()?, config.planner.model.clone());
    if let Some(base_url) = &config.planner.base_url {
        planner_config = planner_config.with_base_url(base_url.clone());
    }
    let planner = OpenAiPlanner::new(planner_config)?;

    // One backend per invocation; the catalog only exists for local.
    let backend = match &args.backend.sqlite {
        Some(db_path) => ExecutionBackend::Local {
            db_path: db_path.clone(),
        },
        None => ExecutionBackend::Remote {
            url: config.sda.endpoint.clone(),
            timeout: config.sda.timeout(),
        },
    };
    let (executor, catalog): (Box<dyn QueryExecutor>, Option<SchemaCatalog>) = match &backend {
        ExecutionBackend::Local { db_path } => {
            let executor = LocalExecutor::open(db_path).await?;
            let catalog = SchemaCatalog::introspect(executor.pool()).await?;
            (Box::new(executor), Some(catalog))
        }
        ExecutionBackend::Remote { url, timeout } => {
            (Box::new(RemoteExecutor::new(url.clone(), *timeout)?), None)
        }
    };

    let request = AskRequest {
        question: args.question.clone(),
        mapunit: args.mapunit.clone(),
        output: args.output.clone(),
        format,
        method,
        depth_cm: args.depth,
    };
    let ctx = AskContext {
        planner: &planner,
        kb: &kb,
        store: &store,
        executor: executor.as_ref(),
        catalog: catalog.as_ref(),
    };

    let outcome = ctx.ask(&request).await?;
    println!("Planned SQL:\n{}", outcome.sql);
    println!("Wrote {} <{}>.", outcome.format, outcome.output);
    Ok(())
}

fn planner_api_key() -> Result<String> {
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        soilq::error::SoilqError::config(
            "OPENAI_API_KEY is not set; the planner needs an API key",
        )
    })
}
