use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    clients::{database::DatabaseClient, gateway::EvolutionClient, health::HealthChecker},
    config::Config,
    engine::{CampaignEngine, CampaignStore, deliver_message},
    error::EngineError,
    models::{
        campaign::{ContactRecipient, ProgressView},
        media::{MediaLimits, MediaPayload},
        message::{CreateMessageLog, DeliveryStatus, summarize_content},
        response::ApiResponse,
        health::HealthStatus,
        validation::{validate_message_template, validate_phone},
    },
};

pub struct AppState {
    pub engine: Arc<CampaignEngine>,
    pub gateway: Arc<EvolutionClient>,
    pub store: Arc<DatabaseClient>,
    pub health_checker: HealthChecker,
    pub media_limits: MediaLimits,
    pub default_delay_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct MediaUpload {
    pub filename: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    pub contacts: Vec<ContactRecipient>,

    #[serde(default)]
    pub message: String,

    pub delay_seconds: Option<u64>,

    #[serde(default)]
    pub media: Vec<MediaUpload>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub phone: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub media: Vec<MediaUpload>,
}

#[derive(Debug, Deserialize)]
pub struct RecentMessagesQuery {
    pub limit: Option<i64>,
}

pub async fn run_api_server(
    config: Config,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/tenants/{tenant_id}/campaign/start",
            post(start_campaign),
        )
        .route(
            "/api/tenants/{tenant_id}/campaign/progress",
            get(campaign_progress),
        )
        .route(
            "/api/tenants/{tenant_id}/campaign/stop",
            post(stop_campaign),
        )
        .route("/api/tenants/{tenant_id}/messages/send", post(send_message))
        .route(
            "/api/tenants/{tenant_id}/messages/recent",
            get(recent_messages),
        )
        .route(
            "/api/tenants/{tenant_id}/connection",
            get(connection_status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
    Json(body): Json<StartCampaignRequest>,
) -> Result<Json<ApiResponse<()>>, EngineError> {
    if !body.message.is_empty() {
        validate_message_template(&body.message)
            .map_err(|e| EngineError::InvalidCampaignRequest(e.to_string()))?;
    }

    let media = decode_media(&body.media, &state.media_limits)
        .map_err(|e| EngineError::InvalidCampaignRequest(e.to_string()))?;

    let delay_seconds = body.delay_seconds.unwrap_or(state.default_delay_seconds);

    let summary = state
        .engine
        .start(tenant_id, &body.contacts, &body.message, delay_seconds, media)?;

    Ok(Json(ApiResponse::ok(summary)))
}

async fn campaign_progress(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
) -> Json<ProgressView> {
    Json(state.engine.progress(tenant_id))
}

async fn stop_campaign(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, EngineError> {
    let message = state.engine.stop(tenant_id)?;

    Ok(Json(ApiResponse::ok(message)))
}

/// Immediate single send, bypassing the campaign queue. The outcome is
/// reported synchronously and logged on success.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    if let Err(e) = validate_phone(&body.phone) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    if body.message.is_empty() && body.media.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Either a message or media files are required".to_string(),
        );
    }

    let media = match decode_media(&body.media, &state.media_limits) {
        Ok(media) => media,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let channel = match state.store.fetch_channel(tenant_id).await {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "No gateway instance registered for tenant".to_string(),
            );
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    match deliver_message(
        state.gateway.as_ref(),
        &channel,
        &body.phone,
        &body.message,
        &media,
    )
    .await
    {
        Ok(()) => {
            let content = summarize_content(&body.message, media.len());
            let log =
                CreateMessageLog::new(tenant_id, body.phone.clone(), content, DeliveryStatus::Sent);

            if let Err(e) = state.store.append_message_log(log).await {
                warn!(error = %e, tenant_id, "Failed to write message log");
            }

            Json(ApiResponse::ok("Message sent successfully".to_string())).into_response()
        }
        Err(failure) => error_response(StatusCode::BAD_GATEWAY, failure.to_string()),
    }
}

async fn recent_messages(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
    Query(query): Query<RecentMessagesQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(5).clamp(1, 100);

    match state.store.recent_messages(tenant_id, limit).await {
        Ok(messages) => Json(ApiResponse::success(
            messages,
            "Recent messages retrieved".to_string(),
        ))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn connection_status(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
) -> Response {
    let channel = match state.store.fetch_channel(tenant_id).await {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "No gateway instance registered for tenant".to_string(),
            );
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    match state.gateway.connection_state(&channel).await {
        Ok(connection) => Json(ApiResponse::success(
            connection,
            "Connection state retrieved".to_string(),
        ))
        .into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

fn decode_media(uploads: &[MediaUpload], limits: &MediaLimits) -> Result<Vec<MediaPayload>, Error> {
    uploads
        .iter()
        .map(|upload| MediaPayload::from_base64(&upload.filename, &upload.data, limits))
        .collect()
}

fn error_response(status: StatusCode, error: String) -> Response {
    let body = ApiResponse::<()>::error(error, "Request rejected".to_string());

    (status, Json(body)).into_response()
}
