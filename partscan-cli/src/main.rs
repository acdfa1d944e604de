//! `partscan`: identify manufacturer part numbers in photos.

use clap::{Parser, Subcommand};
use partscan_cli::batch::run_batch;
use partscan_cli::images::load_image;
use partscan_cli::settings::CommonArgs;
use partscan_cli::CliError;
use partscan_gemini::CredentialPool;
use partscan_pipeline::orchestrator::Orchestrator;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the part number in one image
    Identify {
        /// Path to the image
        #[arg(long)]
        image: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Identify part numbers in many images with parallel workers
    Batch {
        /// Paths to the images
        #[arg(long, num_args = 1.., required = true)]
        images: Vec<PathBuf>,
        /// Number of independent workers
        #[arg(long, default_value_t = 1)]
        workers: usize,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check whether a known number is legible in an image
    Verify {
        /// Path to the image
        #[arg(long)]
        image: PathBuf,
        /// The part number to look for
        #[arg(long)]
        number: String,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Results go to stdout, logs to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Identify {
            image,
            json,
            common,
        } => run_identify(&image, json, &common).await,
        Commands::Batch {
            images,
            workers,
            common,
        } => run_batch_command(images, workers, &common).await,
        Commands::Verify {
            image,
            number,
            common,
        } => run_verify(&image, &number, &common).await,
    }
}

async fn run_identify(image: &Path, json: bool, common: &CommonArgs) -> Result<(), CliError> {
    let payload = load_image(image).await?;
    let mut orchestrator = Orchestrator::new(
        common.client()?,
        CredentialPool::new(common.api_keys()?)?,
        common.profile()?,
        common.pipeline_config()?,
    );

    let report = orchestrator.identify(&payload).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.outcome);
    }
    Ok(())
}

async fn run_batch_command(
    images: Vec<PathBuf>,
    workers: usize,
    common: &CommonArgs,
) -> Result<(), CliError> {
    let client = common.client()?;
    let lines = run_batch(
        images,
        &common.api_keys()?,
        workers,
        &common.profile()?,
        &common.pipeline_config()?,
        || client.clone(),
    )
    .await?;

    for line in lines {
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

async fn run_verify(image: &Path, number: &str, common: &CommonArgs) -> Result<(), CliError> {
    let payload = load_image(image).await?;
    let mut orchestrator = Orchestrator::new(
        common.client()?,
        CredentialPool::new(common.api_keys()?)?,
        common.profile()?,
        common.pipeline_config()?,
    );

    let outcome = orchestrator.verify(number, &payload).await?;
    println!("{outcome}");
    Ok(())
}
