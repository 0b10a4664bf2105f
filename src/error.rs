use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::models::response::ApiResponse;

/// Synchronous rejections surfaced to the caller of start/stop. Everything
/// that happens during dispatch is absorbed into counters and logs instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidCampaignRequest(String),

    #[error("No active campaign found")]
    NoActiveCampaign,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidCampaignRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::NoActiveCampaign => StatusCode::NOT_FOUND,
        };

        let body = ApiResponse::<()>::error(self.to_string(), "Request rejected".to_string());

        (status, Json(body)).into_response()
    }
}
