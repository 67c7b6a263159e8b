//! The model session: the single in-memory slot for the currently loaded
//! vision model, and the result of the most recent extraction.
//!
//! ## Why one slot?
//!
//! Vision model weights run from under a gigabyte to tens of gigabytes.
//! Holding exactly one model resident — loaded lazily on explicit request,
//! replaced unconditionally when a different model is requested — is the
//! entire resource-management policy of the studio. There is no LRU and no
//! multi-model residency on purpose.
//!
//! ## Failure ordering
//!
//! `ensure_loaded` loads the requested model first and only then releases
//! the predecessor. A failed load therefore leaves the previously resident
//! model untouched and usable.

use crate::engine::{EngineModel, GenerateOptions, Generation, VisionEngine};
use crate::error::{ExtractError, ModelLoadError};
use crate::models::{self, ModelSpec};
use crate::postprocess;
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The resident model: its catalog entry plus the engine-side handle.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub spec: &'static ModelSpec,
    pub handle: EngineModel,
}

/// Single-slot cache of the loaded vision model.
pub struct ModelSession {
    engine: Arc<dyn VisionEngine>,
    loaded: Option<LoadedModel>,
}

impl ModelSession {
    /// An empty session backed by `engine`. Nothing is loaded until
    /// [`ModelSession::ensure_loaded`] is called.
    pub fn new(engine: Arc<dyn VisionEngine>) -> Self {
        Self {
            engine,
            loaded: None,
        }
    }

    /// The currently resident model, if any.
    pub fn loaded(&self) -> Option<&LoadedModel> {
        self.loaded.as_ref()
    }

    /// Make `tag` the resident model, reusing the cached handles when it
    /// already is.
    ///
    /// A repeat request for the resident model performs no engine work.
    /// A request for a different model pulls and loads it (seconds to
    /// minutes on first use), then releases the predecessor. On failure
    /// the slot is left exactly as it was.
    pub async fn ensure_loaded(&mut self, tag: &str) -> Result<&LoadedModel, ModelLoadError> {
        if self.loaded.as_ref().is_some_and(|m| m.spec.tag == tag) {
            debug!("Model {tag} already resident, reusing");
            return Ok(self.loaded.as_ref().expect("slot checked above"));
        }

        let spec = models::find(tag).ok_or_else(|| ModelLoadError::UnknownModel {
            name: tag.to_string(),
            known: models::known_tags(),
        })?;

        info!("Loading model {tag} via {}", self.engine.name());
        let handle = self.engine.load(tag).await?;

        if let Some(prev) = self.loaded.replace(LoadedModel { spec, handle }) {
            // The predecessor is released only after the new model is in.
            // An unload failure is logged, not surfaced: the new session is
            // already valid and the engine will reap the old model itself.
            if let Err(e) = self.engine.unload(prev.spec.tag).await {
                warn!("Failed to unload previous model {}: {e}", prev.spec.tag);
            }
        }

        Ok(self.loaded.as_ref().expect("slot populated above"))
    }

    /// Run one extraction against the resident model.
    pub async fn extract(
        &self,
        prompt: &str,
        image: &DynamicImage,
        options: &GenerateOptions,
    ) -> Result<Generation, ExtractError> {
        let loaded = self.loaded.as_ref().ok_or(ExtractError::NoModel)?;
        self.engine
            .generate(loaded.spec.tag, prompt, image, options)
            .await
    }
}

/// The stored outcome of the most recent successful extraction.
///
/// Persists across UI fetches until the next successful extraction
/// overwrites it. Navigating to another page afterwards does not clear it:
/// the result always describes the page and model that were active when it
/// was produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Cleaned-up generated text.
    pub text: String,
    /// Model tag that produced the text.
    pub model: String,
    /// Zero-based page index the text was extracted from.
    pub page_index: usize,
    /// Tokens consumed by prompt and image.
    pub prompt_tokens: u64,
    /// Tokens generated.
    pub output_tokens: u64,
    /// Wall-clock duration of the extraction.
    pub duration_ms: u64,
    /// Decode-phase generation speed.
    pub tokens_per_sec: f64,
    /// Resident memory of the model at load time, if the engine reports it.
    pub peak_memory_bytes: Option<u64>,
}

impl ExtractionResult {
    /// Build a result from a raw generation, cleaning the text on the way.
    pub fn new(generation: Generation, model: &LoadedModel, page_index: usize) -> Self {
        Self {
            text: postprocess::tidy(&generation.text),
            model: model.spec.tag.to_string(),
            page_index,
            prompt_tokens: generation.prompt_tokens,
            output_tokens: generation.output_tokens,
            duration_ms: generation.duration_ms,
            tokens_per_sec: generation.tokens_per_sec,
            peak_memory_bytes: model.handle.resident_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted engine: counts lifecycle calls, optionally fails loads.
    #[derive(Default)]
    struct ScriptedEngine {
        loads: AtomicUsize,
        generates: AtomicUsize,
        unloaded: Mutex<Vec<String>>,
        fail_load_for: Option<String>,
    }

    #[async_trait]
    impl VisionEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn load(&self, model: &str) -> Result<EngineModel, ModelLoadError> {
            if self.fail_load_for.as_deref() == Some(model) {
                return Err(ModelLoadError::PullFailed {
                    model: model.to_string(),
                    reason: "scripted failure".into(),
                });
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(EngineModel {
                tag: model.to_string(),
                template: None,
                resident_bytes: Some(1_000_000),
            })
        }

        async fn unload(&self, model: &str) -> Result<(), ModelLoadError> {
            self.unloaded.lock().unwrap().push(model.to_string());
            Ok(())
        }

        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
            _image: &DynamicImage,
            _options: &GenerateOptions,
        ) -> Result<Generation, ExtractError> {
            self.generates.fetch_add(1, Ordering::SeqCst);
            Ok(Generation {
                text: "# Heading\n\nsome text".into(),
                prompt_tokens: 10,
                output_tokens: 5,
                duration_ms: 12,
                tokens_per_sec: 400.0,
            })
        }
    }

    fn session_with(engine: ScriptedEngine) -> (ModelSession, Arc<ScriptedEngine>) {
        let engine = Arc::new(engine);
        (ModelSession::new(engine.clone()), engine)
    }

    #[tokio::test]
    async fn ensure_loaded_is_idempotent_for_same_name() {
        let (mut session, engine) = session_with(ScriptedEngine::default());
        session.ensure_loaded("qwen2.5vl:3b").await.unwrap();
        session.ensure_loaded("qwen2.5vl:3b").await.unwrap();
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
        assert!(engine.unloaded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn requesting_second_model_replaces_and_unloads_first() {
        let (mut session, engine) = session_with(ScriptedEngine::default());
        session.ensure_loaded("qwen2.5vl:3b").await.unwrap();
        session.ensure_loaded("qwen2.5vl:7b").await.unwrap();

        assert_eq!(session.loaded().unwrap().spec.tag, "qwen2.5vl:7b");
        assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
        assert_eq!(
            engine.unloaded.lock().unwrap().as_slice(),
            ["qwen2.5vl:3b"]
        );
    }

    #[tokio::test]
    async fn failed_load_leaves_previous_model_resident() {
        let (mut session, engine) = session_with(ScriptedEngine {
            fail_load_for: Some("qwen2.5vl:7b".into()),
            ..Default::default()
        });
        session.ensure_loaded("qwen2.5vl:3b").await.unwrap();

        let err = session.ensure_loaded("qwen2.5vl:7b").await.unwrap_err();
        assert!(matches!(err, ModelLoadError::PullFailed { .. }));
        assert_eq!(session.loaded().unwrap().spec.tag, "qwen2.5vl:3b");
        assert!(engine.unloaded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_load_on_empty_slot_leaves_it_empty() {
        let (mut session, _engine) = session_with(ScriptedEngine {
            fail_load_for: Some("qwen2.5vl:3b".into()),
            ..Default::default()
        });
        session.ensure_loaded("qwen2.5vl:3b").await.unwrap_err();
        assert!(session.loaded().is_none());
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_without_engine_call() {
        let (mut session, engine) = session_with(ScriptedEngine::default());
        let err = session.ensure_loaded("made-up:1b").await.unwrap_err();
        assert!(matches!(err, ModelLoadError::UnknownModel { .. }));
        assert_eq!(engine.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extract_without_model_fails() {
        let (session, _engine) = session_with(ScriptedEngine::default());
        let img = image::DynamicImage::new_rgba8(4, 4);
        let opts = GenerateOptions {
            temperature: 0.1,
            max_tokens: 64,
        };
        let err = session.extract("read this", &img, &opts).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoModel));
    }

    #[tokio::test]
    async fn extraction_result_records_model_and_page() {
        let (mut session, _engine) = session_with(ScriptedEngine::default());
        let loaded = session.ensure_loaded("qwen2.5vl:3b").await.unwrap().clone();

        let img = image::DynamicImage::new_rgba8(4, 4);
        let opts = GenerateOptions {
            temperature: 0.1,
            max_tokens: 64,
        };
        let generation = session.extract("read this", &img, &opts).await.unwrap();
        let result = ExtractionResult::new(generation, &loaded, 2);

        assert_eq!(result.model, "qwen2.5vl:3b");
        assert_eq!(result.page_index, 2);
        assert!(!result.text.is_empty());
        assert_eq!(result.peak_memory_bytes, Some(1_000_000));
    }
}
