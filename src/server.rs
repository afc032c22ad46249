//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/predict` | Multipart upload (`question`, `file`, optional `session_id`); ingests and answers |
//! | `POST` | `/sessions/{id}/ask` | JSON `{"question": ...}` against the session's active document |
//! | `DELETE` | `/sessions/{id}` | Drop a session and its memory |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Contract
//!
//! Success and failure share one shape:
//!
//! ```json
//! { "success": true, "result": "The sky is blue.", "message": "",
//!   "session_id": "6f1c...", "collection": "9a0b..." }
//! ```
//!
//! Failures set `success: false`, put the reason in `message` and use
//! status 400 (bad format or request), 413 (oversize), 404 (unknown
//! collection or session), 502 (model or embedding failure), 504 (request
//! timeout) or 500. Every failure is logged; the server keeps serving.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use docqa_core::DocQaError;

use crate::config::Config;
use crate::service::{AskOutcome, DocumentService};
use crate::sessions::SessionRegistry;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Clone)]
struct AppState {
    service: Arc<DocumentService>,
    sessions: Arc<SessionRegistry>,
    request_timeout: Duration,
}

/// Starts the server on `[server].bind` with providers built from `config`.
///
/// Runs migrations first, so `docqa serve` works on a fresh database.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = DocumentService::from_config(config).await?;
    run_server_with(config, Arc::new(service)).await
}

/// Starts the server with an already-built service.
pub async fn run_server_with(config: &Config, service: Arc<DocumentService>) -> anyhow::Result<()> {
    let app = router(config, service)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server listening");
    println!("docqa server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router without binding.
pub fn router(config: &Config, service: Arc<DocumentService>) -> anyhow::Result<Router> {
    let origins = config
        .server
        .allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|_| anyhow::anyhow!("invalid CORS origin: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        service,
        sessions: Arc::new(SessionRegistry::new(
            config.memory.max_turns,
            config.memory.max_sessions,
            Duration::from_secs(config.memory.session_idle_secs),
        )),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };

    let body_limit = config.ingest.max_file_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Ok(Router::new()
        .route("/predict", post(handle_predict))
        .route("/sessions/{id}/ask", post(handle_session_ask))
        .route("/sessions/{id}", delete(handle_delete_session))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(usize::try_from(body_limit).unwrap_or(usize::MAX)))
        .layer(cors)
        .with_state(state))
}

// ============ Response shape ============

#[derive(Serialize)]
struct PredictResponse {
    success: bool,
    result: Option<String>,
    message: String,
    session_id: Option<String>,
    collection: Option<String>,
}

impl PredictResponse {
    fn ok(session_id: String, outcome: AskOutcome) -> Self {
        Self {
            success: true,
            result: Some(outcome.answer),
            message: String::new(),
            session_id: Some(session_id),
            collection: Some(outcome.collection_key),
        }
    }
}

/// Failure converted into the shared response shape.
struct AppError {
    status: StatusCode,
    message: String,
    session_id: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            session_id: None,
        }
    }

    fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = PredictResponse {
            success: false,
            result: None,
            message: self.message,
            session_id: self.session_id,
            collection: None,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, message)
}

impl From<DocQaError> for AppError {
    fn from(err: DocQaError) -> Self {
        let status = match &err {
            DocQaError::UnsupportedFormat(_)
            | DocQaError::Extraction(_)
            | DocQaError::EmptyExtraction => StatusCode::BAD_REQUEST,
            DocQaError::Oversize { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DocQaError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            DocQaError::AnswerGeneration(_) | DocQaError::Embedding(_) => StatusCode::BAD_GATEWAY,
            DocQaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %format!("{:#}", err), "request failed");
        } else {
            warn!(error = %err, "request rejected");
        }
        AppError::new(status, err.to_string())
    }
}

/// Run `fut` under the configured request timeout.
async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, DocQaError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            error!(timeout_secs = limit.as_secs(), "request timed out");
            Err(AppError::new(
                StatusCode::GATEWAY_TIMEOUT,
                format!("request timed out after {}s", limit.as_secs()),
            ))
        }
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

// ============ POST /predict ============

struct PredictForm {
    question: String,
    file_name: String,
    bytes: Vec<u8>,
    session_id: Option<String>,
}

async fn read_predict_form(mut multipart: Multipart) -> Result<PredictForm, AppError> {
    let mut question = None;
    let mut file = None;
    let mut session_id = None;

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e.body_text(), "invalid multipart body");
        AppError::new(e.status(), e.body_text())
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "question" => question = Some(field.text().await.map_err(multipart_error)?),
            "session_id" => session_id = Some(field.text().await.map_err(multipart_error)?),
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| bad_request("file field has no file name"))?;
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let question = question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("question must not be empty"))?;
    let (file_name, bytes) = file.ok_or_else(|| bad_request("file is required"))?;

    Ok(PredictForm {
        question,
        file_name,
        bytes,
        session_id,
    })
}

async fn handle_predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>, AppError> {
    let form = read_predict_form(multipart).await?;
    let (session_id, session) = state
        .sessions
        .get_or_create(form.session_id.as_deref())
        .await;

    let mut session = session.lock().await;
    let outcome = with_timeout(
        state.request_timeout,
        state
            .service
            .ask(&mut session, &form.file_name, form.bytes, &form.question),
    )
    .await
    .map_err(|e| e.with_session(&session_id))?;

    Ok(Json(PredictResponse::ok(session_id, outcome)))
}

// ============ POST /sessions/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn handle_session_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty").with_session(&id));
    }
    let session = state.sessions.get(&id).await.ok_or_else(|| {
        AppError::new(StatusCode::NOT_FOUND, format!("unknown session: {}", id))
    })?;

    let mut session = session.lock().await;
    let outcome = with_timeout(
        state.request_timeout,
        state.service.ask_active(&mut session, &req.question),
    )
    .await
    .map_err(|e| e.with_session(&id))?;

    Ok(Json(PredictResponse::ok(id, outcome)))
}

// ============ DELETE /sessions/{id} ============

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(&id).await {
        info!(session = %id, "session dropped");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::new(
            StatusCode::NOT_FOUND,
            format!("unknown session: {}", id),
        ))
    }
}
