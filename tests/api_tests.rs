use axum::{http::StatusCode, response::IntoResponse};
use campaign_service::{
    error::EngineError,
    models::{
        campaign::ProgressView,
        message::{display_excerpt, summarize_content},
        response::ApiResponse,
    },
};
use serde_json::json;

/// Test: Synchronous rejections map to the expected status codes
#[test]
fn test_engine_error_status_codes() {
    let response =
        EngineError::InvalidCampaignRequest("No contacts provided".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = EngineError::NoActiveCampaign.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test: The response envelope omits absent data and error fields
#[test]
fn test_api_response_envelope_shape() {
    let ok = serde_json::to_value(ApiResponse::ok("Campaign stopped".to_string())).unwrap();
    assert_eq!(
        ok,
        json!({"success": true, "message": "Campaign stopped"})
    );

    let error = serde_json::to_value(ApiResponse::<()>::error(
        "No contacts provided".to_string(),
        "Request rejected".to_string(),
    ))
    .unwrap();
    assert_eq!(
        error,
        json!({
            "success": false,
            "error": "No contacts provided",
            "message": "Request rejected"
        })
    );
}

/// Test: The zero progress view serializes with a lowercase state
#[test]
fn test_progress_view_serialization() {
    let view = serde_json::to_value(ProgressView::none()).unwrap();

    assert_eq!(view["state"], "none");
    assert_eq!(view["total"], 0);
    assert_eq!(view["percentage"], 0.0);
    assert!(view.get("started_at").is_none());
}

/// Test: Log summaries mention attachments and excerpts are bounded
#[test]
fn test_log_content_helpers() {
    assert_eq!(summarize_content("Hello", 0), "Hello");
    assert_eq!(summarize_content("Hello", 2), "[media: 2 files] Hello");
    assert_eq!(summarize_content("", 1), "[media: 1 files]");

    assert_eq!(display_excerpt("short"), "short");

    let long = "x".repeat(60);
    let excerpt = display_excerpt(&long);
    assert_eq!(excerpt.chars().count(), 53);
    assert!(excerpt.ends_with("..."));
}
