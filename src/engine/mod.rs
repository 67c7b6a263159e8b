//! The vision-engine seam.
//!
//! Everything the studio needs from an inference backend is expressed by
//! the [`VisionEngine`] trait: make a model resident, run one prompt+image
//! generation against it, and release it again. Weight download, caching,
//! and tokenization are entirely the backend's problem — the studio only
//! drives the lifecycle and records the metadata the backend reports.
//!
//! [`ollama::OllamaEngine`] is the production backend; tests script their
//! own implementations of the trait.

pub mod ollama;

use crate::error::{ExtractError, ModelLoadError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::Serialize;
use std::io::Cursor;

/// Handle to a model the engine has made resident.
///
/// The engine owns both the weights and the preprocessor (chat template,
/// tokenizer); this handle carries what the studio shows the user about
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct EngineModel {
    /// Engine-side model tag, e.g. `qwen2.5vl:7b`.
    pub tag: String,
    /// The model's chat template as reported by the engine, if any.
    pub template: Option<String>,
    /// Bytes of memory the resident model occupies, if the engine
    /// reports it.
    pub resident_bytes: Option<u64>,
}

/// Per-request generation knobs.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Output of one generation, with the metadata the engine reports.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    /// The generated text, exactly as the engine returned it.
    pub text: String,
    /// Tokens consumed by the prompt and image.
    pub prompt_tokens: u64,
    /// Tokens generated.
    pub output_tokens: u64,
    /// Wall-clock duration of the whole request.
    pub duration_ms: u64,
    /// Generation speed over the decode phase.
    pub tokens_per_sec: f64,
}

/// A local vision-inference backend.
///
/// Implementations must be `Send + Sync`: the handle is shared across web
/// handlers (which themselves serialise all access through the session
/// lock).
#[async_trait]
pub trait VisionEngine: Send + Sync {
    /// Human-readable backend name for logs and the UI.
    fn name(&self) -> &str;

    /// Download `model`'s weights if absent, then load them into memory.
    ///
    /// May take seconds to minutes on first use. Must not disturb any
    /// other resident model on failure.
    async fn load(&self, model: &str) -> Result<EngineModel, ModelLoadError>;

    /// Release a previously loaded model's memory.
    async fn unload(&self, model: &str) -> Result<(), ModelLoadError>;

    /// Run one prompt+image generation against a loaded model.
    ///
    /// Blocking from the caller's perspective: no timeout, no retry, no
    /// partial-token streaming.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &DynamicImage,
        options: &GenerateOptions,
    ) -> Result<Generation, ExtractError>;
}

/// Encode a page image as base64 PNG for the engine's wire format.
///
/// PNG rather than JPEG: lossless compression preserves text crispness,
/// and compression artefacts on rendered text measurably degrade OCR
/// accuracy.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, ExtractError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::ImageEncode(e.to_string()))?;
    Ok(STANDARD.encode(&buf))
}
