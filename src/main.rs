//! `titanic-prep` command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use titanic_prep::config::PipelineConfig;
use titanic_prep::observability::{CompositeObserver, FileObserver, PipelineObserver, TracingObserver};
use titanic_prep::pipeline::Pipeline;
use titanic_prep::reader::{DataReader, FileTableSource, RelationalSource};

#[derive(Parser, Debug)]
#[command(name = "titanic-prep", version, about = "Ingest, validate and split the Titanic dataset")]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the artifacts directory.
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    /// Override the flat file read by the ingestion stage.
    #[arg(long, global = true)]
    flat_file: Option<PathBuf>,

    /// Serve this local CSV/JSON file as the relational table instead of querying a database.
    #[arg(long, global = true)]
    db_snapshot: Option<PathBuf>,

    /// Also append stage events to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run ingestion, validation and preprocessing
    Run,
    /// Validate a data file against the Titanic schema
    Validate {
        /// CSV or JSON file to check
        data: PathBuf,
    },
    /// Split and transform a data file
    Preprocess {
        /// CSV or JSON file to split
        data: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "titanic_prep=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let pipeline = Pipeline::new(config).with_observer(build_observer(&cli));

    match &cli.command {
        None | Some(Commands::Run) => {
            let source = relational_source(&cli, pipeline.config())?;
            let reader = DataReader::new(&*source, &pipeline.config().source);
            let out = pipeline.run(&reader)?;
            tracing::info!(
                validated_rows = out.validated_rows,
                train = %out.split.train_path.display(),
                test = %out.split.test_path.display(),
                features = out.split.feature_names.len(),
                "pipeline finished"
            );
        }
        Some(Commands::Validate { data }) => {
            let rows = pipeline.run_validation(data)?;
            tracing::info!(rows, file = %data.display(), "schema validation passed");
        }
        Some(Commands::Preprocess { data }) => {
            let out = pipeline.run_preprocessing(data)?;
            tracing::info!(
                train = %out.train_path.display(),
                test = %out.test_path.display(),
                features = ?out.feature_names,
                "preprocessing finished"
            );
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.artifacts_dir {
        config.artifacts.dir = dir.clone();
    }
    if let Some(flat) = &cli.flat_file {
        config.source.flat_file = flat.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_observer(cli: &Cli) -> Arc<dyn PipelineObserver> {
    let mut composite = CompositeObserver::new(vec![Arc::new(TracingObserver)]);
    if let Some(path) = &cli.log_file {
        composite.push(Arc::new(FileObserver::new(path)));
    }
    Arc::new(composite)
}

fn relational_source(cli: &Cli, config: &PipelineConfig) -> anyhow::Result<Box<dyn RelationalSource>> {
    match &cli.db_snapshot {
        Some(path) => Ok(Box::new(FileTableSource::new(path))),
        None => database_source(config),
    }
}

#[cfg(feature = "db_connectorx")]
fn database_source(config: &PipelineConfig) -> anyhow::Result<Box<dyn RelationalSource>> {
    use titanic_prep::config::DbConfig;
    use titanic_prep::reader::ConnectorXSource;

    let db = DbConfig::from_env().context("reading database settings from the environment")?;
    Ok(Box::new(ConnectorXSource::new(&db, &config.source.db_scheme)))
}

#[cfg(not(feature = "db_connectorx"))]
fn database_source(_config: &PipelineConfig) -> anyhow::Result<Box<dyn RelationalSource>> {
    anyhow::bail!("built without the `db_connectorx` feature; pass --db-snapshot <file> instead")
}
