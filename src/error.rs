//! Error types for the ocr-studio library.
//!
//! Three distinct error types reflect the three distinct user actions that
//! can fail:
//!
//! * [`RasterizeError`] — the uploaded bytes could not be turned into page
//!   images. The upload is rejected and no partial document is retained.
//!
//! * [`ModelLoadError`] — the requested vision model could not be made
//!   resident. The session slot is left exactly as it was: the previously
//!   loaded model (if any) stays usable.
//!
//! * [`ExtractError`] — a single extraction request failed. The previously
//!   stored result (if any) stays displayed.
//!
//! There is no retry anywhere: every failure is terminal for that single
//! user action and is surfaced directly, so the messages carry enough
//! context for the user to fix the cause and re-trigger the action.

use thiserror::Error;

/// Failures while converting uploaded PDF bytes into page images.
#[derive(Debug, Error)]
pub enum RasterizeError {
    /// The uploaded bytes are not a PDF at all.
    #[error("Uploaded file is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// The upload was empty or truncated below the smallest possible PDF.
    #[error("Uploaded file is empty or truncated ({len} bytes)")]
    TooShort { len: usize },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing it with: qpdf --decrypt input.pdf output.pdf")]
    Corrupt { detail: String },

    /// The document is encrypted; this application does not take passwords.
    #[error("PDF is encrypted. Decrypt it first, e.g.: qpdf --decrypt --password=PW input.pdf output.pdf")]
    Encrypted,

    /// The document opened but contains no pages.
    #[error("PDF contains no pages")]
    EmptyDocument,

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// Unexpected internal error (task panic etc.).
    #[error("Internal rasterisation error: {0}")]
    Internal(String),
}

/// Failures while making a vision model resident in the inference engine.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The requested name is not in the supported-model catalog.
    #[error("Unknown model '{name}'. Supported models: {known}")]
    UnknownModel { name: String, known: String },

    /// The inference engine did not answer at all.
    #[error(
        "Vision engine unreachable at {url}: {reason}\n\
         Check that the engine is running (e.g. `ollama serve`) and that the URL is correct."
    )]
    EngineUnreachable { url: String, reason: String },

    /// The weight download failed (network, disk, missing repository).
    #[error("Failed to pull weights for '{model}': {reason}")]
    PullFailed { model: String, reason: String },

    /// The engine refused to load the model (unsupported architecture,
    /// insufficient memory, corrupt weights).
    #[error("Engine could not load '{model}': {detail}")]
    LoadRejected { model: String, detail: String },
}

/// Failures during a single extraction request.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No document has been uploaded yet.
    #[error("No document uploaded. Upload a PDF before extracting.")]
    NoDocument,

    /// No model is resident yet.
    #[error("No model loaded. Load a vision model before extracting.")]
    NoModel,

    /// The current page image could not be encoded for the engine.
    #[error("Failed to encode page image: {0}")]
    ImageEncode(String),

    /// The engine returned an error for this generation.
    #[error("Extraction failed on model '{model}': {reason}")]
    EngineFailed { model: String, reason: String },
}
