//! HTTP handlers: thin adapters between the JSON API and
//! [`SessionState`](super::state::SessionState).
//!
//! Every mutating handler returns the full state snapshot so the page can
//! re-render itself from one response. Failures map onto the three error
//! kinds of the library, each with its own status code; nothing is
//! retried.

use super::state::StateSnapshot;
use super::AppState;
use crate::error::{ExtractError, ModelLoadError, RasterizeError};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{error, info};

/// The single embedded page.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

/// Current session snapshot.
pub async fn get_state(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.session.lock().await.snapshot())
}

/// Upload a PDF (multipart field `file`) and rasterise it.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StateSnapshot>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("missing 'file' field".into()))?;

    let mut session = state.session.lock().await;
    let page_count = session.upload(&file_name, bytes).await?;
    info!("Upload accepted: '{file_name}' ({page_count} pages)");
    Ok(Json(session.snapshot()))
}

/// Current page rendered as PNG.
pub async fn page_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let session = state.session.lock().await;
    let (document, nav) = session
        .document()
        .ok_or_else(|| ApiError::NotFound("no document uploaded".into()))?;
    let image = document
        .page(nav.index())
        .ok_or_else(|| ApiError::NotFound("page out of range".into()))?;

    let png = encode_png(image)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            // The same URL serves whichever page the cursor is on.
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

pub async fn next_page(State(state): State<AppState>) -> Result<Json<StateSnapshot>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .next_page()
        .ok_or_else(|| ApiError::Conflict("no document uploaded".into()))?;
    Ok(Json(session.snapshot()))
}

pub async fn previous_page(State(state): State<AppState>) -> Result<Json<StateSnapshot>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .previous_page()
        .ok_or_else(|| ApiError::Conflict("no document uploaded".into()))?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct SelectPageRequest {
    pub index: usize,
}

pub async fn select_page(
    State(state): State<AppState>,
    Json(req): Json<SelectPageRequest>,
) -> Result<Json<StateSnapshot>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .select_page(req.index)
        .ok_or_else(|| ApiError::Conflict("no document uploaded".into()))?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    pub model: String,
}

/// Make the requested catalog model resident. Blocks for the duration of
/// the pull+load — minutes on a first-time download.
pub async fn load_model(
    State(state): State<AppState>,
    Json(req): Json<LoadModelRequest>,
) -> Result<Json<StateSnapshot>, ApiError> {
    let mut session = state.session.lock().await;
    session.load_model(&req.model).await?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize, Default)]
pub struct ExtractRequest {
    pub prompt: Option<String>,
}

/// Extract text from the current page with the resident model.
pub async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<StateSnapshot>, ApiError> {
    let mut session = state.session.lock().await;
    session.run_extraction(req.prompt.as_deref()).await?;
    Ok(Json(session.snapshot()))
}

/// Most recent extraction as a plain-text attachment.
pub async fn download_result(State(state): State<AppState>) -> Result<Response, ApiError> {
    let session = state.session.lock().await;
    let result = session
        .result()
        .ok_or_else(|| ApiError::NotFound("no extraction result yet".into()))?;

    let filename = format!("ocr_page_{}.txt", result.page_index + 1);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        result.text.clone(),
    )
        .into_response())
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ApiError::Internal(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}

// ── Error mapping ────────────────────────────────────────────────────────

/// JSON error envelope every failing endpoint returns.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    Rasterize(RasterizeError),
    ModelLoad(ModelLoadError),
    Extract(ExtractError),
}

impl From<RasterizeError> for ApiError {
    fn from(e: RasterizeError) -> Self {
        Self::Rasterize(e)
    }
}

impl From<ModelLoadError> for ApiError {
    fn from(e: ModelLoadError) -> Self {
        Self::ModelLoad(e)
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
            // Upload rejected; nothing of it was retained.
            ApiError::Rasterize(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::ModelLoad(e) => {
                let status = match e {
                    ModelLoadError::UnknownModel { .. } => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::Extract(e) => {
                let status = match e {
                    ExtractError::NoDocument | ExtractError::NoModel => StatusCode::CONFLICT,
                    ExtractError::ImageEncode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    ExtractError::EngineFailed { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
        };

        error!("Request failed ({status}): {message}");
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
