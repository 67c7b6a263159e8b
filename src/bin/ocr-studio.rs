//! The ocr-studio binary: parse launch flags, start the web shell.
//!
//! A thin shim over the library crate. The interactive surface is the
//! browser page, so the CLI carries nothing but process-launch settings.

use anyhow::{Context, Result};
use clap::Parser;
use ocr_studio::web::{serve, AppState};
use ocr_studio::{OllamaEngine, StudioConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Interactive PDF OCR with a locally-running vision language model.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-studio",
    version,
    about = "Interactive PDF OCR with a locally-running vision language model",
    long_about = "Serves a single-page studio: upload a PDF, page through its rendered \
images, and extract text/markdown from the current page with a vision model running \
on your own machine via an Ollama-compatible engine. No data leaves localhost."
)]
struct Cli {
    /// Listening address of the web shell.
    #[arg(long, env = "OCR_STUDIO_BIND", default_value = ocr_studio::config::DEFAULT_BIND_ADDR)]
    bind: String,

    /// Base URL of the local inference engine.
    #[arg(long, env = "OCR_STUDIO_ENGINE_URL", default_value = ocr_studio::config::DEFAULT_ENGINE_URL)]
    engine_url: String,

    /// Rendering DPI for page rasterisation (72–400).
    #[arg(long, env = "OCR_STUDIO_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Max tokens the model may generate per extraction.
    #[arg(long, env = "OCR_STUDIO_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: u32,

    /// How long the engine keeps the loaded model resident, in seconds.
    #[arg(long, env = "OCR_STUDIO_KEEP_ALIVE", default_value_t = 1800)]
    keep_alive: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR_STUDIO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR_STUDIO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = StudioConfig::builder()
        .bind_addr(cli.bind)
        .engine_url(cli.engine_url)
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .model_keep_alive_secs(cli.keep_alive)
        .build()
        .context("Invalid configuration")?;

    let engine = Arc::new(OllamaEngine::new(
        config.engine_url.clone(),
        config.model_keep_alive_secs,
    ));

    serve(AppState::new(config, engine))
        .await
        .context("Server failed")
}
