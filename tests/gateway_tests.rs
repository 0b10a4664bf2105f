use anyhow::Result;
use campaign_service::{
    clients::gateway::EvolutionClient,
    config::Config,
    engine::MessageSender,
    models::{
        gateway::TenantChannel,
        media::{MediaLimits, MediaPayload},
    },
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

/// Test: A 201 from the gateway counts as a delivered text message
#[tokio::test]
async fn test_send_text_success() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/main-instance"))
        .and(header("apikey", "global-key"))
        .and(body_json(json!({
            "number": "15551234567",
            "textMessage": {"text": "Hello Ana"}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let channel = test_channel(None);

    let result = client.send_text(&channel, "15551234567", "Hello Ana").await;
    assert!(result.is_ok());

    Ok(())
}

/// Test: A gateway error becomes a delivery failure value, not a panic
#[tokio::test]
async fn test_send_text_failure_is_a_value() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/main-instance"))
        .respond_with(ResponseTemplate::new(500).set_body_string("instance disconnected"))
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let channel = test_channel(None);

    let failure = client
        .send_text(&channel, "15551234567", "Hello")
        .await
        .expect_err("500 must map to a delivery failure");

    assert!(failure.reason.contains("500"));
    assert!(failure.reason.contains("instance disconnected"));

    Ok(())
}

/// Test: Media sends carry mediatype, base64 data and caption
#[tokio::test]
async fn test_send_media_payload_shape() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendMedia/main-instance"))
        .and(body_json(json!({
            "number": "15551234567",
            "mediaMessage": {
                "mediatype": "image",
                "media": "YWJj",
                "caption": "Look at this"
            }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let channel = test_channel(None);
    let payload = MediaPayload::from_bytes("photo.png", b"abc", &test_limits())?;

    let result = client
        .send_media(&channel, "15551234567", &payload, "Look at this")
        .await;
    assert!(result.is_ok());

    Ok(())
}

/// Test: A tenant-specific key overrides the global gateway key
#[tokio::test]
async fn test_tenant_api_key_overrides_global() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/tenant-instance"))
        .and(header("apikey", "tenant-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let channel = TenantChannel {
        instance_name: "tenant-instance".to_string(),
        api_key: Some("tenant-key".to_string()),
    };

    let result = client.send_text(&channel, "15551234567", "Hello").await;
    assert!(result.is_ok());

    Ok(())
}

/// Test: Connection state maps "open" to connected
#[tokio::test]
async fn test_connection_state_open() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instance/connectionState/main-instance"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"instance": {"state": "open"}})),
        )
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let connection = client.connection_state(&test_channel(None)).await?;

    assert_eq!(connection.state, "open");
    assert!(connection.connected);

    Ok(())
}

/// Test: Any non-open state means disconnected
#[tokio::test]
async fn test_connection_state_closed() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instance/connectionState/main-instance"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"instance": {"state": "close"}})),
        )
        .mount(&server)
        .await;

    let client = EvolutionClient::new(&test_config(&server.uri()))?;
    let connection = client.connection_state(&test_channel(None)).await?;

    assert_eq!(connection.state, "close");
    assert!(!connection.connected);

    Ok(())
}

fn test_config(base_url: &str) -> Config {
    Config {
        database_url: "postgres://localhost/campaigns".to_string(),
        gateway_api_url: base_url.to_string(),
        gateway_api_key: "global-key".to_string(),
        server_port: 0,
        default_delay_seconds: 0,
        send_text_timeout_seconds: 5,
        send_media_timeout_seconds: 5,
        max_image_bytes: 10 * 1024 * 1024,
        max_video_bytes: 50 * 1024 * 1024,
    }
}

fn test_channel(api_key: Option<&str>) -> TenantChannel {
    TenantChannel {
        instance_name: "main-instance".to_string(),
        api_key: api_key.map(str::to_string),
    }
}

fn test_limits() -> MediaLimits {
    MediaLimits {
        max_image_bytes: 10 * 1024 * 1024,
        max_video_bytes: 50 * 1024 * 1024,
    }
}
