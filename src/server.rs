//! HTTP server.
//!
//! Exposes upload, listing, clearing and question answering as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `POST`   | `/api/upload` | admin | Multipart upload (field `file`), extract and store |
//! | `GET`    | `/api/files`  | admin | Uploaded files and total chunk count |
//! | `DELETE` | `/api/clear`  | admin | Empty the knowledge base |
//! | `POST`   | `/api/ask`    | none  | Answer `{ "question": ... }` |
//! | `GET`    | `/health`     | none  | Health check (returns version) |
//!
//! Admin routes need `Authorization: Bearer <token>`, where the token is read
//! from the environment variable named by `[server].admin_token_env` at
//! startup. If that variable is unset, every admin request is refused.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_file", "message": "invalid file: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_format` (400),
//! `invalid_file` (400), `unauthorized` (401), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use kb_harness_core::models::KnowledgeBaseSummary;
use kb_harness_core::store::KnowledgeStore;

use crate::answer::{self, AnswerGenerator, ChatCompletionGenerator};
use crate::config::Config;
use crate::extract::ExtractError;
use crate::ingest;
use crate::sqlite_store::SqliteStore;

/// Largest accepted request body.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn KnowledgeStore>,
    pub generator: Arc<dyn AnswerGenerator>,
    /// `None` locks every admin route.
    pub admin_token: Option<String>,
}

/// Starts the HTTP server on `[server].bind` with the SQLite store and the
/// configured chat-completion generator. Runs until the process is killed.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::connect(config).await?;
    let generator = ChatCompletionGenerator::from_config(&config.llm)?;
    let admin_token = std::env::var(&config.server.admin_token_env)
        .ok()
        .filter(|t| !t.is_empty());
    if admin_token.is_none() {
        tracing::warn!(
            var = %config.server.admin_token_env,
            "admin token not set; admin routes will reject every request"
        );
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        generator: Arc::new(generator),
        admin_token,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// All routes with CORS and the upload size limit applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/files", get(handle_files))
        .route("/api/clear", delete(handle_clear))
        .route("/api/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into a JSON HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Extraction failures are the client's fault; anything else is ours.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ExtractError>() {
            Some(ExtractError::UnsupportedFormat(_)) => Self::new(
                StatusCode::BAD_REQUEST,
                "unsupported_format",
                err.to_string(),
            ),
            Some(ExtractError::Container(_) | ExtractError::Format(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_file", err.to_string())
            }
            None => {
                tracing::error!(error = %err, "request failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    err.to_string(),
                )
            }
        }
    }
}

/// Accept only `Authorization: Bearer <token>` matching the admin token.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::unauthorized());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(AppError::unauthorized()),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/upload ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    ok: bool,
    new_chunks: usize,
    total_chunks: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    require_admin(&state, &headers)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("file field has no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?;
        upload = Some((name, bytes.to_vec()));
        break;
    }
    let (name, bytes) = upload.ok_or_else(|| AppError::bad_request("missing file field"))?;

    let report = ingest::ingest_file(state.store.as_ref(), &state.config, &name, bytes).await?;

    Ok(Json(UploadResponse {
        ok: true,
        new_chunks: report.new_chunks,
        total_chunks: report.total_chunks,
    }))
}

// ============ GET /api/files ============

async fn handle_files(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<KnowledgeBaseSummary>, AppError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.store.summary().await?))
}

// ============ DELETE /api/clear ============

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

async fn handle_clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&state, &headers)?;
    state.store.clear().await?;
    tracing::info!("knowledge base cleared");
    Ok(Json(OkResponse { ok: true }))
}

// ============ POST /api/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
}

/// A missing or malformed body is a `bad_request` in the usual error shape.
async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    if req.question.trim().is_empty() {
        return Err(AppError::bad_request("question must not be empty"));
    }
    let answer = answer::ask(
        state.store.as_ref(),
        state.generator.as_ref(),
        &req.question,
        state.config.retrieval.top_k,
    )
    .await?;
    Ok(Json(AskResponse { answer }))
}
