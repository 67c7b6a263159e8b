//! # ocr-studio
//!
//! Interactive PDF OCR in the browser, backed by a locally-running vision
//! language model.
//!
//! ## Why this crate?
//!
//! Classic PDF text extraction falls apart on scans, complex layouts, and
//! tables. ocr-studio instead rasterises each page and lets a vision model
//! running on *your own machine* read it as a human would — nothing leaves
//! localhost, and there is no API key to configure. The browser page is
//! just a remote control: upload a PDF, flip through the rendered pages,
//! load one of five supported vision models, and extract the current page
//! as markdown.
//!
//! ## Session Overview
//!
//! ```text
//! upload ──▶ Document      pages rasterised once via pdfium, memoized
//!             │
//! prev/next ─▶ Navigator   clamped page cursor, pure index mutation
//!             │
//! load ─────▶ ModelSession one resident model, lazy, replaced on change
//!             │
//! extract ──▶ VisionEngine prompt + page image → text + metadata
//!             │
//!             ExtractionResult  kept until the next successful extraction
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_studio::{OllamaEngine, StudioConfig};
//! use ocr_studio::web::{serve, AppState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudioConfig::default();
//!     let engine = Arc::new(OllamaEngine::new(
//!         config.engine_url.clone(),
//!         config.model_keep_alive_secs,
//!     ));
//!     serve(AppState::new(config, engine)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The web shell and the `ocr-studio` binary (axum + clap) |
//!
//! Disable `server` when embedding only the document/session machinery:
//! ```toml
//! ocr-studio = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod markdown;
pub mod models;
pub mod postprocess;
pub mod prompts;
pub mod render;
pub mod session;
#[cfg(feature = "server")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{StudioConfig, StudioConfigBuilder};
pub use document::{Document, Navigator};
pub use engine::ollama::OllamaEngine;
pub use engine::{EngineModel, GenerateOptions, Generation, VisionEngine};
pub use error::{ExtractError, ModelLoadError, RasterizeError};
pub use models::{ModelSpec, SUPPORTED_MODELS};
pub use prompts::DEFAULT_OCR_PROMPT;
pub use session::{ExtractionResult, LoadedModel, ModelSession};
