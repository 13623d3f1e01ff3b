use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use titan_bg_removal::app::BackgroundRemover;
use titan_bg_removal::models::{parse_max_dimension, Config};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "titan-bg-removal")]
#[command(about = "Remove image backgrounds with Amazon Titan Image Generator V2")]
struct CliArgs {
    /// Image to process.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the PNG result. Defaults to `<input>_no_bg.png`.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Longest edge the image is shrunk to before upload.
    #[arg(long, value_name = "PIXELS", value_parser = parse_dimension_arg)]
    max_dimension: Option<u32>,

    /// Bedrock model ID (overrides BEDROCK_MODEL_ID).
    #[arg(long)]
    model_id: Option<String>,

    /// AWS region (overrides AWS_REGION).
    #[arg(long)]
    region: Option<String>,
}

fn parse_dimension_arg(input: &str) -> std::result::Result<u32, String> {
    parse_max_dimension(input).map_err(|e| e.to_string())
}

fn default_output_path(input: &Path) -> PathBuf {
    let file_name = match input.file_stem() {
        Some(stem) => format!("{}_no_bg.png", stem.to_string_lossy()),
        None => "no_bg.png".to_string(),
    };
    input.with_file_name(file_name)
}

fn resolve_config(args: &CliArgs) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(model_id) = &args.model_id {
        config.model_id = model_id.clone();
    }
    if let Some(max_dimension) = args.max_dimension {
        config.max_dimension = max_dimension;
    }
    Ok(config)
}

/// Write through a sibling temp file that is renamed into place, so a failed
/// write never leaves a truncated output behind.
fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.as_file().sync_all()?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    let remover = BackgroundRemover::from_config(&config).await?;
    let image_bytes = remover.run(args.input.as_path()).await?;

    write_output(&output, &image_bytes)?;
    info!("Wrote {} bytes to {}", image_bytes.len(), output.display());

    info!(
        "Finished generating image with Amazon Titan Image Generator V2 model {}.",
        remover.model_id()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "titan_bg_removal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Background removal failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
