// server.rs - axum router for the relay HTTP surface
//
// Routes:
//   GET  /          health check
//   POST /mix       images + prompt → one generated image
//   POST /optimize  prompt → rewritten prompt
//   POST /generate  prompt → numbered list of three variations

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::RelayConfig;
use crate::gemini::{GeminiClient, GenerativeModel};
use crate::prompt;
use crate::relay::{Relay, RelayError};
use crate::wire::{
    self, ErrorCode, ErrorResponse, HealthResponse, MixRequest, MixResponse, OptimizeResponse,
    PromptRequest, VariationsResponse,
};

pub const MIX_EMPTY: &str = "Failed to generate image.";
pub const OPTIMIZE_EMPTY: &str = "Failed to generate prompt.";
pub const VARIATIONS_EMPTY: &str = "Failed to generate prompts.";
pub const MIX_INVALID: &str = wire::MISSING_MIX_INPUT;
pub const PROMPT_INVALID: &str = "A prompt is required.";

// ── Error → response ─────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    body:   ErrorResponse,
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, body: ErrorResponse::new(ErrorCode::InvalidRequest, message) }
    }

    fn no_result(message: &str) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, body: ErrorResponse::new(ErrorCode::NoResult, message) }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidImage { .. } => Self::invalid(err.to_string()),
            RelayError::Provider(p) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body:   ErrorResponse::new(ErrorCode::Provider, p.user_message()),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self { status, body: ErrorResponse::new(ErrorCode::InvalidRequest, rejection.body_text()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".into() })
}

async fn mix<M: GenerativeModel>(
    State(relay): State<Arc<Relay<M>>>,
    body: std::result::Result<Json<MixRequest>, JsonRejection>,
) -> ApiResult<MixResponse> {
    let Json(req) = body?;
    if req.images.is_empty() || prompt::is_blank(&req.prompt) {
        return Err(ApiError::invalid(MIX_INVALID));
    }
    match relay.mix(&req.images, &req.prompt).await? {
        Some(image) => Ok(Json(MixResponse { image })),
        None => Err(ApiError::no_result(MIX_EMPTY)),
    }
}

async fn optimize<M: GenerativeModel>(
    State(relay): State<Arc<Relay<M>>>,
    body: std::result::Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<OptimizeResponse> {
    let Json(req) = body?;
    if prompt::is_blank(&req.prompt) {
        return Err(ApiError::invalid(PROMPT_INVALID));
    }
    match relay.optimize(&req.prompt).await? {
        Some(prompt) => Ok(Json(OptimizeResponse { prompt })),
        None => Err(ApiError::no_result(OPTIMIZE_EMPTY)),
    }
}

async fn generate<M: GenerativeModel>(
    State(relay): State<Arc<Relay<M>>>,
    body: std::result::Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<VariationsResponse> {
    let Json(req) = body?;
    if prompt::is_blank(&req.prompt) {
        return Err(ApiError::invalid(PROMPT_INVALID));
    }
    match relay.generate_variations(&req.prompt).await? {
        Some(prompts) => Ok(Json(VariationsResponse { prompts })),
        None => Err(ApiError::no_result(VARIATIONS_EMPTY)),
    }
}

// ── Router / serve ───────────────────────────────────────────────────────

pub fn router<M: GenerativeModel + 'static>(relay: Arc<Relay<M>>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/mix", post(mix::<M>))
        .route("/optimize", post(optimize::<M>))
        .route("/generate", post(generate::<M>))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(relay)
}

/// Bind and run the relay until the process is stopped.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let model = GeminiClient::new(config.api_key.clone(), &config.gemini_base_url)
        .context("failed to build HTTP client")?;
    let relay = Arc::new(Relay::new(model, config.models.clone()));
    let models = relay.models().clone();
    let app = router(relay, config.body_limit_bytes);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    log::info!(
        "Server is running on port {} (image model: {}, text model: {})",
        config.port, models.image, models.text
    );
    axum::serve(listener, app).await.context("relay server stopped")?;
    Ok(())
}
