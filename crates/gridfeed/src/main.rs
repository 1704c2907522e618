use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gridfeed_bucket::{BucketStore, MemoryBucketStore, S3BucketStore};
use gridfeed_core::config::s3_config_from_env;
use gridfeed_core::pipeline::run_open_meteo;
use gridfeed_core::{
    Dataset, EntsoeClient, EntsoeConfig, EntsoePipeline, FileConfig, IngestConfig, OpenMeteoClient,
    PointPolicy,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Energy and weather time-series ingestion", long_about = None)]
struct Cli {
    /// TOML file with `[ingest]` and `[open_meteo]` tables
    #[arg(long, global = true, env = "GRIDFEED_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch yearly ENTSO-E documents and publish them as Parquet
    Entsoe(EntsoeArgs),
    /// Fetch the Open-Meteo hourly forecast and publish it as CSV
    OpenMeteo(OpenMeteoArgs),
}

#[derive(Args, Debug)]
struct EntsoeArgs {
    /// Datasets to ingest (defaults to all)
    #[arg(value_parser = parse_dataset)]
    datasets: Vec<Dataset>,

    /// Years as `2015-2024` or `2015,2018`
    #[arg(long, value_parser = parse_years)]
    years: Option<YearList>,

    #[command(flatten)]
    target: TargetArgs,

    /// Fail a year on the first malformed point instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct YearList(Vec<i32>);

#[derive(Args, Debug)]
struct OpenMeteoArgs {
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Hourly variables, comma separated
    #[arg(long, value_delimiter = ',')]
    hourly: Vec<String>,

    /// Object key of the published CSV
    #[arg(long)]
    key: Option<String>,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Container (bucket) artifacts are published to
    #[arg(long)]
    container: Option<String>,

    /// Also write each artifact to this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Publish into an in-memory store instead of S3
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut file_config = match &cli.config {
        Some(path) => FileConfig::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => FileConfig::default(),
    };
    file_config.ingest.apply_env(|name| std::env::var(name).ok());

    match cli.command {
        Command::Entsoe(args) => run_entsoe(file_config, args).await,
        Command::OpenMeteo(args) => open_meteo(file_config, args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn run_entsoe(file_config: FileConfig, args: EntsoeArgs) -> Result<()> {
    let mut config = file_config.ingest;
    apply_entsoe_flags(&mut config, &args);
    config.validate()?;

    let datasets = if args.datasets.is_empty() {
        Dataset::ALL.to_vec()
    } else {
        args.datasets
    };

    let entsoe = EntsoeConfig::from_env()?;
    info!(?entsoe, years = ?config.years, container = %config.container, "starting ENTSO-E ingestion");
    let source = Arc::new(EntsoeClient::new(entsoe)?);
    let bucket = bucket_store(&config.container, args.target.dry_run).await?;
    let pipeline = EntsoePipeline::new(source, bucket, config);

    let mut failed = Vec::new();
    for dataset in datasets {
        let report = pipeline.run(dataset).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.has_failures() {
            warn!(dataset = dataset.code(), years = ?report.failed_years(), "ingestion finished with failures");
            failed.push(dataset);
        } else {
            info!(dataset = dataset.code(), rows = report.published_rows(), "ingestion finished");
        }
    }

    if !failed.is_empty() {
        bail!("some years failed for: {failed:?}");
    }
    Ok(())
}

/// Flags win over the config file and the environment.
fn apply_entsoe_flags(config: &mut IngestConfig, args: &EntsoeArgs) {
    if let Some(YearList(years)) = &args.years {
        config.years = years.clone();
    }
    if let Some(container) = &args.target.container {
        config.container = container.clone();
    }
    if let Some(dir) = &args.target.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if args.strict {
        config.point_policy = PointPolicy::Strict;
    }
}

async fn open_meteo(file_config: FileConfig, args: OpenMeteoArgs) -> Result<()> {
    let mut config = file_config.open_meteo;
    if let Some(latitude) = args.latitude {
        config.latitude = latitude;
    }
    if let Some(longitude) = args.longitude {
        config.longitude = longitude;
    }
    if !args.hourly.is_empty() {
        config.hourly = args.hourly;
    }
    if let Some(key) = args.key {
        config.key = key;
    }
    if args.target.output_dir.is_some() {
        config.output_dir = args.target.output_dir;
    }
    config.validate()?;

    let container = args
        .target
        .container
        .unwrap_or(file_config.ingest.container);
    let client = OpenMeteoClient::new(config.base_url.clone())?;
    let bucket = bucket_store(&container, args.target.dry_run).await?;

    let artifact = run_open_meteo(&client, bucket.as_ref(), &config).await?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}

async fn bucket_store(container: &str, dry_run: bool) -> Result<Arc<dyn BucketStore>> {
    if dry_run {
        warn!(container, "dry run; artifacts are kept in memory only");
        return Ok(Arc::new(MemoryBucketStore::new(container)));
    }
    let store = S3BucketStore::new(s3_config_from_env(container))
        .await
        .context("failed to configure S3 client")?;
    Ok(Arc::new(store))
}

fn parse_dataset(value: &str) -> Result<Dataset, String> {
    value.parse()
}

fn parse_years(value: &str) -> Result<YearList, String> {
    let parse = |raw: &str| {
        raw.trim()
            .parse::<i32>()
            .map_err(|_| format!("'{raw}' is not a year"))
    };

    if let Some((first, last)) = value.split_once('-') {
        let (first, last) = (parse(first)?, parse(last)?);
        if first > last {
            return Err(format!("range {first}-{last} is empty"));
        }
        return Ok(YearList((first..=last).collect()));
    }
    value.split(',').map(parse).collect::<Result<_, _>>().map(YearList)
}
