//! Shared session state for the web shell.
//!
//! One user, one session: everything the UI can see or mutate lives in a
//! single [`SessionState`] guarded by one `tokio::sync::Mutex` (see
//! [`super::AppState`]). Each handler holds the lock for the whole user
//! action, so actions are strictly serialised — the in-process equivalent
//! of the original shell's one-rerun-per-action model. The methods here
//! carry all the behaviour; the handlers are thin HTTP adapters over them.

use crate::config::StudioConfig;
use crate::document::{Document, Navigator};
use crate::engine::{GenerateOptions, VisionEngine};
use crate::error::{ExtractError, ModelLoadError, RasterizeError};
use crate::markdown;
use crate::models;
use crate::prompts::DEFAULT_OCR_PROMPT;
use crate::session::{ExtractionResult, ModelSession};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// All mutable state of one interactive session.
pub struct SessionState {
    config: StudioConfig,
    document: Option<(Document, Navigator)>,
    session: ModelSession,
    result: Option<ExtractionResult>,
}

impl SessionState {
    pub fn new(config: StudioConfig, engine: Arc<dyn VisionEngine>) -> Self {
        Self {
            config,
            document: None,
            session: ModelSession::new(engine),
            result: None,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Rasterise an upload and make it the session document.
    ///
    /// The new document replaces the old one wholesale, and the cursor
    /// resets to page 0. On failure the previous document (and cursor)
    /// stay exactly as they were — nothing of the rejected upload is
    /// retained.
    pub async fn upload(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<usize, RasterizeError> {
        let document = Document::rasterize(file_name, bytes, &self.config).await?;
        let page_count = document.page_count();
        info!("Document '{file_name}' loaded: {page_count} pages");
        self.document = Some((document, Navigator::new(page_count)));
        Ok(page_count)
    }

    /// The current document and cursor, if an upload succeeded.
    pub fn document(&self) -> Option<&(Document, Navigator)> {
        self.document.as_ref()
    }

    /// Move to the next page. Returns the new index, or `None` without a
    /// document.
    pub fn next_page(&mut self) -> Option<usize> {
        let (_, nav) = self.document.as_mut()?;
        nav.next();
        Some(nav.index())
    }

    /// Move to the previous page. Returns the new index, or `None` without
    /// a document.
    pub fn previous_page(&mut self) -> Option<usize> {
        let (_, nav) = self.document.as_mut()?;
        nav.previous();
        Some(nav.index())
    }

    /// Jump to a page (clamped). Returns the new index, or `None` without
    /// a document.
    pub fn select_page(&mut self, index: usize) -> Option<usize> {
        let (_, nav) = self.document.as_mut()?;
        nav.select(index);
        Some(nav.index())
    }

    /// Make `tag` the resident model (cache hit if it already is).
    pub async fn load_model(&mut self, tag: &str) -> Result<(), ModelLoadError> {
        self.session.ensure_loaded(tag).await.map(|_| ())
    }

    /// Extract text from the current page with the resident model.
    ///
    /// An empty or missing prompt falls back to the built-in one. The
    /// stored result is overwritten only on success; a failed extraction
    /// leaves the previous result untouched.
    pub async fn run_extraction(
        &mut self,
        prompt: Option<&str>,
    ) -> Result<&ExtractionResult, ExtractError> {
        let (document, nav) = self.document.as_ref().ok_or(ExtractError::NoDocument)?;
        let page_index = nav.index();
        let image = document.page(page_index).ok_or(ExtractError::NoDocument)?;

        let prompt = match prompt.map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_OCR_PROMPT,
        };
        let options = GenerateOptions {
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let generation = self.session.extract(prompt, image, &options).await?;
        let loaded = self.session.loaded().ok_or(ExtractError::NoModel)?;
        self.result = Some(ExtractionResult::new(generation, loaded, page_index));
        Ok(self.result.as_ref().expect("stored above"))
    }

    /// The most recent successful extraction, if any.
    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    /// Serialisable snapshot of everything the page renders.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            default_prompt: DEFAULT_OCR_PROMPT,
            models: models::SUPPORTED_MODELS
                .iter()
                .map(|m| ModelEntry {
                    tag: m.tag,
                    label: m.label,
                    family: m.family,
                    download_size: m.download_size_label(),
                })
                .collect(),
            document: self.document.as_ref().map(|(doc, nav)| DocumentInfo {
                file_name: doc.file_name().to_string(),
                page_count: doc.page_count(),
                page_index: nav.index(),
            }),
            loaded_model: self.session.loaded().map(|m| LoadedModelInfo {
                tag: m.spec.tag,
                label: m.spec.label,
                resident_bytes: m.handle.resident_bytes,
            }),
            result: self.result.as_ref().map(ResultView::from),
        }
    }
}

// ── Snapshot wire types ──────────────────────────────────────────────────

/// Everything the single page needs to render itself after any action.
#[derive(Debug, Serialize)]
pub struct StateSnapshot {
    pub default_prompt: &'static str,
    pub models: Vec<ModelEntry>,
    pub document: Option<DocumentInfo>,
    pub loaded_model: Option<LoadedModelInfo>,
    pub result: Option<ResultView>,
}

#[derive(Debug, Serialize)]
pub struct ModelEntry {
    pub tag: &'static str,
    pub label: &'static str,
    pub family: &'static str,
    pub download_size: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub page_count: usize,
    pub page_index: usize,
}

#[derive(Debug, Serialize)]
pub struct LoadedModelInfo {
    pub tag: &'static str,
    pub label: &'static str,
    pub resident_bytes: Option<u64>,
}

/// The stored result in both raw and rendered form.
///
/// Carrying both lets the markdown toggle flip between them client-side
/// without re-invoking extraction.
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub text: String,
    pub html: String,
    pub model: String,
    pub page_index: usize,
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    pub tokens_per_sec: f64,
    pub peak_memory_bytes: Option<u64>,
}

impl From<&ExtractionResult> for ResultView {
    fn from(r: &ExtractionResult) -> Self {
        Self {
            text: r.text.clone(),
            html: markdown::to_html(&r.text),
            model: r.model.clone(),
            page_index: r.page_index,
            prompt_tokens: r.prompt_tokens,
            output_tokens: r.output_tokens,
            duration_ms: r.duration_ms,
            tokens_per_sec: r.tokens_per_sec,
            peak_memory_bytes: r.peak_memory_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineModel, Generation};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Engine whose generate can be flipped to fail mid-test.
    #[derive(Default)]
    struct FlippableEngine {
        generates: AtomicUsize,
        fail_generate: AtomicBool,
    }

    #[async_trait]
    impl VisionEngine for FlippableEngine {
        fn name(&self) -> &str {
            "flippable"
        }

        async fn load(&self, model: &str) -> Result<EngineModel, ModelLoadError> {
            Ok(EngineModel {
                tag: model.to_string(),
                template: None,
                resident_bytes: None,
            })
        }

        async fn unload(&self, _model: &str) -> Result<(), ModelLoadError> {
            Ok(())
        }

        async fn generate(
            &self,
            model: &str,
            _prompt: &str,
            _image: &DynamicImage,
            _options: &GenerateOptions,
        ) -> Result<Generation, ExtractError> {
            if self.fail_generate.load(Ordering::SeqCst) {
                return Err(ExtractError::EngineFailed {
                    model: model.to_string(),
                    reason: "scripted failure".into(),
                });
            }
            self.generates.fetch_add(1, Ordering::SeqCst);
            Ok(Generation {
                text: "## Extracted\n\n| a | b |\n|---|---|\n| 1 | 2 |".into(),
                prompt_tokens: 20,
                output_tokens: 10,
                duration_ms: 5,
                tokens_per_sec: 2000.0,
            })
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])))
    }

    fn state_with_doc(pages: usize) -> (SessionState, Arc<FlippableEngine>) {
        let engine = Arc::new(FlippableEngine::default());
        let mut state = SessionState::new(StudioConfig::default(), engine.clone());
        state.document = Some((
            Document::from_pages("test.pdf", (0..pages).map(|_| page()).collect()),
            Navigator::new(pages),
        ));
        (state, engine)
    }

    #[tokio::test]
    async fn navigation_without_document_is_none() {
        let engine = Arc::new(FlippableEngine::default());
        let mut state = SessionState::new(StudioConfig::default(), engine);
        assert!(state.next_page().is_none());
        assert!(state.previous_page().is_none());
        assert!(state.select_page(2).is_none());
    }

    #[tokio::test]
    async fn three_page_walk_clamps_at_the_end() {
        let (mut state, _) = state_with_doc(3);
        assert_eq!(state.next_page(), Some(1));
        assert_eq!(state.next_page(), Some(2));
        assert_eq!(state.next_page(), Some(2), "clamped at the last page");
    }

    #[tokio::test]
    async fn extraction_stores_result_for_current_page() {
        let (mut state, _) = state_with_doc(3);
        state.load_model("qwen2.5vl:3b").await.unwrap();
        state.next_page();

        let result = state.run_extraction(None).await.unwrap();
        assert_eq!(result.page_index, 1);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn failed_extraction_preserves_previous_result() {
        let (mut state, engine) = state_with_doc(2);
        state.load_model("qwen2.5vl:3b").await.unwrap();
        state.run_extraction(Some("read it")).await.unwrap();
        let before = state.result().unwrap().text.clone();

        engine.fail_generate.store(true, Ordering::SeqCst);
        let err = state.run_extraction(Some("read it again")).await.unwrap_err();
        assert!(matches!(err, ExtractError::EngineFailed { .. }));
        assert_eq!(
            state.result().unwrap().text,
            before,
            "a failed extraction must not clear previous output"
        );
    }

    #[tokio::test]
    async fn extraction_without_document_fails() {
        let engine = Arc::new(FlippableEngine::default());
        let mut state = SessionState::new(StudioConfig::default(), engine);
        let err = state.run_extraction(None).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoDocument));
    }

    #[tokio::test]
    async fn result_survives_navigation_unchanged() {
        let (mut state, _) = state_with_doc(3);
        state.load_model("qwen2.5vl:3b").await.unwrap();
        state.run_extraction(None).await.unwrap();

        state.next_page();
        state.next_page();
        let result = state.result().unwrap();
        assert_eq!(result.page_index, 0, "result still describes its own page");
    }

    #[tokio::test]
    async fn snapshot_renders_markdown_without_reinvoking_extraction() {
        let (mut state, engine) = state_with_doc(1);
        state.load_model("qwen2.5vl:3b").await.unwrap();
        state.run_extraction(None).await.unwrap();
        assert_eq!(engine.generates.load(Ordering::SeqCst), 1);

        let first = state.snapshot();
        let second = state.snapshot();
        let (a, b) = (first.result.unwrap(), second.result.unwrap());
        assert_eq!(a.html, b.html);
        assert!(a.html.contains("<table>"));
        assert_eq!(
            engine.generates.load(Ordering::SeqCst),
            1,
            "toggling the rendering must not re-run the model"
        );
    }

    #[tokio::test]
    async fn blank_prompt_falls_back_to_default() {
        let (mut state, _) = state_with_doc(1);
        state.load_model("qwen2.5vl:3b").await.unwrap();
        // Blank and missing prompts behave identically.
        state.run_extraction(Some("   ")).await.unwrap();
        state.run_extraction(None).await.unwrap();
        assert!(state.result().is_some());
    }
}
