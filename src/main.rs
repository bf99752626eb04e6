//! AI images dataset processor.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings.local ──▶ credentials ─┐
//!   processor.toml ──▶ config ──────┼──▶ startup ──▶ HubClient
//!                                    │
//!                                    ▼
//!   ┌────────────────────── pipeline ───────────────────────┐
//!   │  retry(load dataset) ──▶ train_test_split ──▶          │
//!   │  for each batch: retry(publish batch)                  │
//!   └────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;

use ai_images_processor::dataset::DatasetDict;
use ai_images_processor::lifecycle::{bootstrap, pipeline, resolve_config, Overrides};
use ai_images_processor::observability::logging;
use ai_images_processor::PipelineError;

#[derive(Parser)]
#[command(name = "ai-images-processor")]
#[command(about = "Split a hosted image dataset into train/test and republish it", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// dotenv-style file holding the access token
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Maximum retries after the first attempt
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Fixed delay between retries, in seconds
    #[arg(long)]
    delay_secs: Option<f64>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Commands {
    /// Load, split and publish the dataset
    #[default]
    Process,
    /// Load and split only; print the partition without publishing
    Inspect,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("{} {}", "error:".red().bold(), e.red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    let overrides = Overrides {
        settings_path: cli.settings,
        retry_limit: cli.retry_limit,
        delay_secs: cli.delay_secs,
        log_level: cli.log_level,
    };

    let config = resolve_config(cli.config.as_deref(), &overrides)?;
    logging::init(&config.observability);
    tracing::info!("ai-images-processor v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = bootstrap(config)?;

    match cli.command.unwrap_or_default() {
        Commands::Process => {
            let (dict, report) = pipeline::run(&ctx).await?;
            print_splits(&dict);
            println!(
                "{} {} files in {} commits to {}/{}",
                "published".green().bold(),
                report.files,
                report.commits.len(),
                ctx.config.publish.repo,
                ctx.config.publish.data_dir
            );
        }
        Commands::Inspect => {
            let dict = pipeline::load_and_split(&ctx).await?;
            print_splits(&dict);
        }
    }

    Ok(())
}

fn print_splits(dict: &DatasetDict) {
    for (name, split) in &dict.splits {
        println!("{} {} records", format!("{:>6}", name).cyan().bold(), split.len());
        for (label, count) in split.label_counts() {
            println!("       {} {}", label.dimmed(), count);
        }
    }
}
