//! Our HTTP API.

use std::{any::Any, sync::Arc};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any as CorsAny, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{
        AnalysisOutcome, AnalysisRequest, DocumentModel, HealthResponse, ModelsResponse,
    },
    prelude::*,
    service::AnalysisService,
    validate::{UploadError, check_upload},
};

/// The name we report from `/health`.
const SERVICE_NAME: &str = "azure-ocr-api";

/// Extra room in the request body for JSON framing and `data:` URL headers.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

/// State shared by all our handlers. Read-only once the server starts.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub service: AnalysisService,
}

/// An error response. The body is always `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// The client sent something we can't use.
    BadRequest(String),

    /// The decoded file is over our size limit.
    PayloadTooLarge(String),

    /// The request body couldn't be extracted at all.
    Rejected { status: StatusCode, detail: String },

    /// Something went wrong on our side. We don't say what.
    Internal,
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

/// Convert a body rejection, reporting our file size limit when the body
/// was too big to buffer.
fn reject_body(rejection: JsonRejection, max_file_size: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::from(UploadError::TooLarge {
            max_size: max_file_size,
        })
    } else {
        ApiError::from(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::PayloadTooLarge(detail) => (StatusCode::PAYLOAD_TOO_LARGE, detail),
            ApiError::Rejected { status, detail } => (status, detail),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Create our router.
pub fn create_router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config.allowed_origins)?;
    let body_limit = request_body_limit(state.config.limits.max_file_size);
    Ok(Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Serve our API until we receive Ctrl-C.
pub async fn run_server(bind_addr: &str, state: AppState) -> Result<()> {
    let app = create_router(state)?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to listen on {bind_addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    Ok(())
}

/// Wait for Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// How big a request body we accept: enough for a maximum-size file in
/// Base64, plus some headroom. Anything bigger gets a 413 before we parse it.
fn request_body_limit(max_file_size: usize) -> usize {
    max_file_size
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_LIMIT_HEADROOM)
}

/// Build our CORS layer. `*` allows any origin.
fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(CorsAny)
            .allow_methods(CorsAny)
            .allow_headers(CorsAny));
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("invalid allowed origin: {origin:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    // Credentials can't be combined with wildcards, so mirror the request.
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Turn a panic into a generic 500.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    error!("Unhandled error: {detail}");
    ApiError::Internal.into_response()
}

/// `GET /health`. Never talks to the remote service.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        service: SERVICE_NAME.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// `GET /models`.
async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        available_models: DocumentModel::ALL
            .iter()
            .map(|model| model.as_str().to_owned())
            .collect(),
    })
}

/// `POST /analyze`.
#[instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn analyze(
    State(state): State<AppState>,
    request: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let max_file_size = state.config.limits.max_file_size;
    let Json(request) = request.map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        reject_body(rejection, max_file_size)
    })?;

    let upload = check_upload(&request.file_data, &state.config.limits).map_err(|err| {
        warn!("Rejected upload: {err}");
        ApiError::from(err)
    })?;
    info!(
        "Processing file: {}, model: {}, file_type: {:?}",
        upload.content_type, request.model, request.file_type
    );
    let options = request.options();
    if !options.is_empty() {
        debug!(options = ?options, "Ignoring analysis options");
    }

    let outcome = state
        .service
        .analyze(upload.payload.bytes, request.model)
        .await;
    Ok(Json(outcome))
}
