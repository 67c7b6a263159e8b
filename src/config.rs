//! Configuration for an ocr-studio session.
//!
//! Every knob lives in one [`StudioConfig`] struct, built via its
//! [`StudioConfigBuilder`]. Keeping the knobs together makes it trivial to
//! share the config across the web handlers and to log the effective
//! settings at startup.

use crate::error::ModelLoadError;
use serde::{Deserialize, Serialize};

/// Default listening address for the web shell.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Default base URL of the local inference engine.
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:11434";

/// Configuration for the studio.
///
/// Built via [`StudioConfig::builder()`] or [`StudioConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr_studio::StudioConfig;
///
/// let config = StudioConfig::builder()
///     .dpi(150)
///     .max_tokens(1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 200.
    ///
    /// 200 DPI keeps small print legible for the vision model while staying
    /// within the pixel budget of the image encoders used by the supported
    /// models. Lower it for very large pages, raise it for tiny fonts.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI: a 200-DPI render of an A0 poster
    /// would otherwise produce a five-figure pixel dimension and exhaust
    /// memory. Either dimension is capped, the other scales proportionally.
    pub max_rendered_pixels: u32,

    /// Maximum tokens the model may generate per extraction. Default: 2048.
    ///
    /// Dense pages (tables, code listings) need headroom; setting this too
    /// low silently truncates the output mid-sentence.
    pub max_tokens: u32,

    /// Sampling temperature for generation. Default: 0.1.
    ///
    /// Near-zero keeps the model faithful to what is on the page, which is
    /// what transcription wants. Higher values introduce creativity that
    /// worsens OCR accuracy.
    pub temperature: f32,

    /// Listening address of the web shell. Default: `127.0.0.1:8501`.
    pub bind_addr: String,

    /// Base URL of the local inference engine. Default: `http://127.0.0.1:11434`.
    pub engine_url: String,

    /// How long the engine keeps the loaded model resident between
    /// requests, in seconds. Default: 1800.
    ///
    /// The session slot holds one model for the whole interactive session;
    /// a generous keep-alive stops the engine from paging the weights out
    /// between extractions.
    pub model_keep_alive_secs: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2000,
            max_tokens: 2048,
            temperature: 0.1,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            model_keep_alive_secs: 1800,
        }
    }
}

impl StudioConfig {
    /// Create a new builder for `StudioConfig`.
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StudioConfig`].
#[derive(Debug)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn engine_url(mut self, url: impl Into<String>) -> Self {
        self.config.engine_url = url.into();
        self
    }

    pub fn model_keep_alive_secs(mut self, secs: u64) -> Self {
        self.config.model_keep_alive_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudioConfig, ModelLoadError> {
        let c = &self.config;
        if !c.engine_url.starts_with("http://") && !c.engine_url.starts_with("https://") {
            return Err(ModelLoadError::EngineUnreachable {
                url: c.engine_url.clone(),
                reason: "engine URL must start with http:// or https://".into(),
            });
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = StudioConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(c.engine_url, DEFAULT_ENGINE_URL);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = StudioConfig::builder()
            .dpi(10_000)
            .temperature(9.0)
            .max_rendered_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_bad_engine_url() {
        let err = StudioConfig::builder()
            .engine_url("localhost:11434")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }
}
