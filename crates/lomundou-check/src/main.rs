//! Lomundou Check - verify a deployment before printing the book
//!
//! Loads the experience config, prints the marker table and reports every
//! target, model or audio file missing under the web root.

mod check;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lomundou_core::ExperienceConfig;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use check::{check_assets, marker_table, AssetKind};

#[derive(Parser, Debug)]
#[command(name = "lomundou-check")]
#[command(about = "Check that every asset of a Lomundou AR deployment is in place")]
#[command(version)]
struct Args {
    /// Experience configuration file, relative to the web root
    #[arg(short, long, default_value = "assets/experience.toml")]
    config: PathBuf,

    /// Web root the asset paths are relative to
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Audio language variant to check instead of the configured one
    #[arg(long)]
    variant: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = args.root.join(&args.config);
    let mut config = ExperienceConfig::load(&config_path)
        .with_context(|| format!("Loading {}", config_path.display()))?;

    if let Some(variant) = args.variant {
        config = config.with_audio_variant(variant);
        config.validate()?;
    }
    info!(variant = %config.experience.audio_variant, "Configuration loaded");

    let report = check_assets(&config, &args.root).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", marker_table(&config));
        println!();
        for missing in report.missing() {
            let what = match missing.kind {
                AssetKind::Target => "target",
                AssetKind::Model => "model",
                AssetKind::Audio => "audio",
            };
            let marker = missing
                .marker
                .map(|m| format!("marker {}", m))
                .unwrap_or_else(|| "experience".to_string());
            println!("MISSING {} {}: {}", marker, what, missing.path);
        }
    }

    if report.is_complete() {
        info!("All {} assets present", report.checks.len());
        if !args.json {
            println!("All assets present");
        }
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{} assets missing", report.missing().count());
        Ok(ExitCode::FAILURE)
    }
}
