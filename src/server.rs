//! HTTP API.
//!
//! Thin handlers over [`AppContext`]: validate parameters, call search or
//! ingestion, serialize JSON.

use crate::context::AppContext;
use crate::error::AmplonError;
use crate::search::{DocumentResult, VideoResult};
use crate::vector_store::IndexedSource;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Upload limit for `POST /ingest-pdf`.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the router with all endpoints.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pdfs = ServeDir::new(ctx.ingestor().upload_dir());

    Router::new()
        .route("/health", get(health))
        .route("/search", get(search_videos))
        .route("/search-pdf", get(search_documents))
        .route(
            "/ingest-pdf",
            post(ingest_pdf).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/ingest-video", post(ingest_video))
        .route("/sources", get(list_sources))
        .nest_service("/pdfs", pdfs)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

// === Errors ===

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Message returned for every 500; details stay in the server log.
const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Handler error mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AmplonError> for ApiError {
    fn from(err: AmplonError) -> Self {
        match err {
            AmplonError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestPdfResponse {
    pub message: String,
    /// Pages with extractable text.
    pub pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct IngestVideoRequest {
    /// Video ID or watch URL.
    pub video_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestVideoResponse {
    pub message: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub videos: Vec<IndexedSource>,
    pub documents: Vec<IndexedSource>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn resolve_params(ctx: &AppContext, params: SearchParams) -> Result<(String, usize), ApiError> {
    let query = params
        .query
        .ok_or_else(|| ApiError::BadRequest("missing required parameter: query".to_string()))?;
    let top_k = params.top_k.unwrap_or(ctx.settings().search.default_top_k);
    Ok((query, top_k))
}

async fn search_videos(
    State(ctx): State<AppContext>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse<VideoResult>>, ApiError> {
    let Query(params) = params?;
    let (query, top_k) = resolve_params(&ctx, params)?;

    let results = ctx.search().search_videos(&query, top_k).await?;
    Ok(Json(SearchResponse { results }))
}

async fn search_documents(
    State(ctx): State<AppContext>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse<DocumentResult>>, ApiError> {
    let Query(params) = params?;
    let (query, top_k) = resolve_params(&ctx, params)?;

    let results = ctx.search().search_documents(&query, top_k).await?;
    Ok(Json(SearchResponse { results }))
}

async fn ingest_pdf(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<IngestPdfResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("uploaded file has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let report = ctx.ingestor().ingest_pdf_bytes(&filename, bytes.to_vec()).await?;

        return Ok(Json(IngestPdfResponse {
            message: format!("Ingested {}", report.source_id),
            pages: report.chunks,
        }));
    }

    Err(ApiError::BadRequest("missing multipart field: file".to_string()))
}

async fn ingest_video(
    State(ctx): State<AppContext>,
    body: Result<Json<IngestVideoRequest>, JsonRejection>,
) -> Result<Json<IngestVideoResponse>, ApiError> {
    let Json(req) = body?;
    let report = ctx.ingestor().ingest_video(&req.video_id).await?;

    Ok(Json(IngestVideoResponse {
        message: format!("Ingested video {}", report.source_id),
        chunks: report.chunks,
    }))
}

async fn list_sources(State(ctx): State<AppContext>) -> Result<Json<SourcesResponse>, ApiError> {
    let settings = ctx.settings();
    let store = ctx.store();

    let videos = store.list_sources(&settings.vector_store.video_collection).await?;
    let documents = store.list_sources(&settings.vector_store.document_collection).await?;

    Ok(Json(SourcesResponse { videos, documents }))
}
