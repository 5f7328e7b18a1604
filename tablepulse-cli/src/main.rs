use clap::{Parser, Subcommand};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tablepulse_common::PipelineConfig;
use tablepulse_core::{
    analyze_and_combine, convert_dir, run_pipeline, sync_prefix, upload_dir, CancelToken,
    HtmlReportGenerator, S3Store,
};
use tracing::warn;

#[derive(Parser)]
#[command(name = "tablepulse", version, about = "CSV ingestion and profiling pipeline")]
struct Cli {
    /// Config file path (default: ./tablepulse.toml, or $TABLEPULSE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror the configured bucket prefix into the raw data folder
    Sync,
    /// Convert raw CSV files into compressed columnar files
    Convert,
    /// Profile columnar files and write the combined analysis artifact
    Analyze {
        #[arg(long)]
        testing: bool,
    },
    /// Upload a local folder (default: the analysis output) back to the bucket
    Upload {
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Full pipeline: sync, convert, analyze
    Run {
        #[arg(long)]
        testing: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("interrupt received, stopping after the current chunk");
            cancel.cancel();
        })?;
    }

    match cli.command {
        Commands::Sync => {
            let store = S3Store::connect(config.sync.endpoint_url.as_deref()).await;
            let files = sync_prefix(&store, &config.sync).await?;
            println!(
                "{} files in {}",
                files.len(),
                config.sync.local_folder.display()
            );
        }
        Commands::Convert => {
            let outputs = convert_dir(&config.convert)?;
            println!(
                "{} columnar files in {}",
                outputs.len(),
                config.convert.output_folder.display()
            );
        }
        Commands::Analyze { testing } => {
            if testing {
                config.analyze.testing = true;
            }
            let path = analyze_and_combine(&config.analyze, &HtmlReportGenerator, &cancel)?;
            println!("combined analysis: {}", path.display());
            print_preview(&path)?;
        }
        Commands::Upload { folder } => {
            let store = S3Store::connect(config.sync.endpoint_url.as_deref()).await;
            let dir = folder.unwrap_or_else(|| config.analyze.output_folder.clone());
            let prefix = config.sync.results_prefix.clone().unwrap_or_default();
            let count = upload_dir(&store, &dir, &config.sync.bucket, &prefix).await?;
            println!("uploaded {count} files from {}", dir.display());
        }
        Commands::Run { testing } => {
            if testing {
                config.analyze.testing = true;
            }
            let store = S3Store::connect(config.sync.endpoint_url.as_deref()).await;
            let path = run_pipeline(&config, &store, &HtmlReportGenerator, &cancel).await?;
            println!("combined analysis: {}", path.display());
            print_preview(&path)?;
        }
    }
    Ok(())
}

const PREVIEW_ROWS: usize = 20;

fn print_preview(path: &Path) -> anyhow::Result<()> {
    let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
        .with_batch_size(PREVIEW_ROWS)
        .build()?;
    if let Some(batch) = reader.next() {
        let batch = batch?;
        arrow::util::pretty::print_batches(&[batch])?;
    }
    Ok(())
}
