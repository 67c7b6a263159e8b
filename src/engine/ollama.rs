//! Ollama backend for the [`VisionEngine`] seam.
//!
//! Talks to a locally-running Ollama server over its HTTP API. The server
//! owns the weight store and the tokenizer; this client drives the model
//! lifecycle the studio needs:
//!
//! * `load`   — `POST /api/pull` (download weights if absent), then an
//!   empty `POST /api/generate` to warm the model into memory, then
//!   `POST /api/show` + `GET /api/ps` to capture the chat template and the
//!   resident memory figure.
//! * `unload` — `POST /api/generate` with `keep_alive: 0`, which tells the
//!   server to release the weights immediately.
//! * `generate` — `POST /api/generate` with the page image attached as
//!   base64 PNG.
//!
//! The client deliberately has no request timeout: a first-time pull of a
//! 20 GB model legitimately runs for minutes, and the studio's contract is
//! to block the action until it completes or fails.

use super::{encode_png_base64, EngineModel, GenerateOptions, Generation, VisionEngine};
use crate::error::{ExtractError, ModelLoadError};
use async_trait::async_trait;
use image::DynamicImage;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Client for an Ollama-compatible inference server.
pub struct OllamaEngine {
    base_url: String,
    keep_alive_secs: u64,
    http: reqwest::Client,
}

impl OllamaEngine {
    /// Create a client for the server at `base_url` (no trailing slash).
    ///
    /// `keep_alive_secs` is how long the server keeps a model resident
    /// after the last request; the studio passes its session keep-alive.
    pub fn new(base_url: impl Into<String>, keep_alive_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client with static configuration");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keep_alive_secs,
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn unreachable(&self, e: reqwest::Error) -> ModelLoadError {
        ModelLoadError::EngineUnreachable {
            url: self.base_url.clone(),
            reason: e.to_string(),
        }
    }

    /// Download the model's weights if the server does not have them yet.
    async fn pull(&self, model: &str) -> Result<(), ModelLoadError> {
        info!("Pulling weights for {model} (first load may take minutes)");
        let resp = self
            .http
            .post(self.url("/api/pull"))
            .json(&json!({ "name": model, "stream": false }))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !resp.status().is_success() {
            return Err(ModelLoadError::PullFailed {
                model: model.to_string(),
                reason: read_engine_error(resp).await,
            });
        }

        let body: PullResponse = resp.json().await.map_err(|e| ModelLoadError::PullFailed {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        if body.status != "success" {
            return Err(ModelLoadError::PullFailed {
                model: model.to_string(),
                reason: body.status,
            });
        }
        Ok(())
    }

    /// Warm the model into memory with an empty generate request.
    async fn warm(&self, model: &str) -> Result<(), ModelLoadError> {
        let resp = self
            .http
            .post(self.url("/api/generate"))
            .json(&json!({
                "model": model,
                "stream": false,
                "keep_alive": format!("{}s", self.keep_alive_secs),
            }))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !resp.status().is_success() {
            return Err(ModelLoadError::LoadRejected {
                model: model.to_string(),
                detail: read_engine_error(resp).await,
            });
        }
        Ok(())
    }

    /// Fetch the model's chat template, if the server exposes one.
    async fn template(&self, model: &str) -> Option<String> {
        let resp = self
            .http
            .post(self.url("/api/show"))
            .json(&json!({ "name": model }))
            .send()
            .await
            .ok()?;
        let body: ShowResponse = resp.json().await.ok()?;
        body.template.filter(|t| !t.is_empty())
    }

    /// Resident memory of `model` according to `GET /api/ps`.
    async fn resident_bytes(&self, model: &str) -> Option<u64> {
        let resp = self.http.get(self.url("/api/ps")).send().await.ok()?;
        let body: PsResponse = resp.json().await.ok()?;
        body.models
            .iter()
            .find(|m| m.name == model)
            .map(|m| if m.size_vram > 0 { m.size_vram } else { m.size })
    }
}

#[async_trait]
impl VisionEngine for OllamaEngine {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn load(&self, model: &str) -> Result<EngineModel, ModelLoadError> {
        let start = Instant::now();
        self.pull(model).await?;
        self.warm(model).await?;

        let template = self.template(model).await;
        let resident_bytes = self.resident_bytes(model).await;
        info!(
            "Model {model} resident in {:.1}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            resident_bytes.unwrap_or(0),
        );

        Ok(EngineModel {
            tag: model.to_string(),
            template,
            resident_bytes,
        })
    }

    async fn unload(&self, model: &str) -> Result<(), ModelLoadError> {
        debug!("Unloading {model}");
        let resp = self
            .http
            .post(self.url("/api/generate"))
            .json(&json!({ "model": model, "stream": false, "keep_alive": 0 }))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !resp.status().is_success() {
            return Err(ModelLoadError::LoadRejected {
                model: model.to_string(),
                detail: read_engine_error(resp).await,
            });
        }
        Ok(())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &DynamicImage,
        options: &GenerateOptions,
    ) -> Result<Generation, ExtractError> {
        let encoded = encode_png_base64(image)?;
        let start = Instant::now();

        let engine_failed = |reason: String| ExtractError::EngineFailed {
            model: model.to_string(),
            reason,
        };

        let resp = self
            .http
            .post(self.url("/api/generate"))
            .json(&json!({
                "model": model,
                "prompt": prompt,
                "images": [encoded],
                "stream": false,
                "keep_alive": format!("{}s", self.keep_alive_secs),
                "options": {
                    "temperature": options.temperature,
                    "num_predict": options.max_tokens,
                },
            }))
            .send()
            .await
            .map_err(|e| engine_failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(engine_failed(read_engine_error(resp).await));
        }

        let body: GenerateResponse = resp.json().await.map_err(|e| engine_failed(e.to_string()))?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let tokens_per_sec = if body.eval_duration > 0 {
            body.eval_count as f64 / (body.eval_duration as f64 / 1e9)
        } else if duration_ms > 0 {
            body.eval_count as f64 / (duration_ms as f64 / 1e3)
        } else {
            0.0
        };

        debug!(
            "Generated {} tokens in {}ms ({:.1} tok/s)",
            body.eval_count, duration_ms, tokens_per_sec
        );
        if body.response.trim().is_empty() {
            warn!("Engine returned empty text for {model}");
        }

        Ok(Generation {
            text: body.response,
            prompt_tokens: body.prompt_eval_count,
            output_tokens: body.eval_count,
            duration_ms,
            tokens_per_sec,
        })
    }
}

/// Best-effort extraction of the `{"error": "..."}` body Ollama returns
/// on failure; falls back to the HTTP status line.
async fn read_engine_error(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<EngineErrorBody>().await {
        Ok(body) if !body.error.is_empty() => body.error,
        _ => format!("HTTP {status}"),
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PsResponse {
    #[serde(default)]
    models: Vec<PsModel>,
}

#[derive(Debug, Deserialize)]
struct PsModel {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    size_vram: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
    /// Nanoseconds spent in the decode phase.
    #[serde(default)]
    eval_duration: u64,
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    #[serde(default)]
    error: String,
}
