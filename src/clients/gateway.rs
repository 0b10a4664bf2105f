use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::time::Duration;
use tracing::{debug, info};

use crate::{
    config::Config,
    engine::MessageSender,
    models::{
        gateway::{
            ConnectionState, ConnectionStateResponse, DeliveryFailure, MediaMessage,
            SendMediaRequest, SendTextRequest, TenantChannel, TextMessage,
        },
        media::MediaPayload,
    },
};

/// Client for the Evolution gateway API. Each tenant maps to one gateway
/// instance; requests authenticate with the tenant's key when present,
/// falling back to the global key.
pub struct EvolutionClient {
    http_client: Client,
    base_url: String,
    global_api_key: String,
    text_timeout: Duration,
    media_timeout: Duration,
}

impl EvolutionClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(base_url = %config.gateway_api_url, "Evolution gateway client initialized");

        Ok(Self {
            http_client,
            base_url: config.gateway_api_url.trim_end_matches('/').to_string(),
            global_api_key: config.gateway_api_key.clone(),
            text_timeout: Duration::from_secs(config.send_text_timeout_seconds),
            media_timeout: Duration::from_secs(config.send_media_timeout_seconds),
        })
    }

    pub async fn connection_state(&self, channel: &TenantChannel) -> Result<ConnectionState, Error> {
        let url = format!(
            "{}/instance/connectionState/{}",
            self.base_url, channel.instance_name
        );

        debug!(instance = %channel.instance_name, "Checking gateway connection state");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", self.api_key(channel))
            .timeout(self.text_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Gateway returned status {}", response.status()));
        }

        let body: ConnectionStateResponse = response.json().await?;
        let connected = body.instance.state == "open";

        Ok(ConnectionState {
            state: body.instance.state,
            connected,
        })
    }

    fn api_key<'a>(&'a self, channel: &'a TenantChannel) -> &'a str {
        channel.api_key.as_deref().unwrap_or(&self.global_api_key)
    }

    /// The gateway answers HTTP 201 for an accepted message; anything else,
    /// including transport errors upstream, is an expected delivery failure.
    async fn check_delivery(response: Response) -> Result<(), DeliveryFailure> {
        if response.status() == StatusCode::CREATED {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Err(DeliveryFailure::new(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl MessageSender for EvolutionClient {
    async fn send_text(
        &self,
        channel: &TenantChannel,
        recipient: &str,
        text: &str,
    ) -> Result<(), DeliveryFailure> {
        debug!(
            recipient,
            instance = %channel.instance_name,
            "Sending text message"
        );

        let request = SendTextRequest {
            number: recipient.to_string(),
            text_message: TextMessage {
                text: text.to_string(),
            },
        };

        let url = format!(
            "{}/message/sendText/{}",
            self.base_url, channel.instance_name
        );

        let response = self
            .http_client
            .post(&url)
            .header("apikey", self.api_key(channel))
            .json(&request)
            .timeout(self.text_timeout)
            .send()
            .await
            .map_err(|e| DeliveryFailure::new(format!("Gateway request failed: {e}")))?;

        Self::check_delivery(response).await
    }

    async fn send_media(
        &self,
        channel: &TenantChannel,
        recipient: &str,
        media: &MediaPayload,
        caption: &str,
    ) -> Result<(), DeliveryFailure> {
        debug!(
            recipient,
            instance = %channel.instance_name,
            filename = %media.filename,
            kind = media.kind.as_str(),
            "Sending media message"
        );

        let request = SendMediaRequest {
            number: recipient.to_string(),
            media_message: MediaMessage {
                mediatype: media.kind.as_str().to_string(),
                media: media.data.clone(),
                caption: caption.to_string(),
            },
        };

        let url = format!(
            "{}/message/sendMedia/{}",
            self.base_url, channel.instance_name
        );

        let response = self
            .http_client
            .post(&url)
            .header("apikey", self.api_key(channel))
            .json(&request)
            .timeout(self.media_timeout)
            .send()
            .await
            .map_err(|e| DeliveryFailure::new(format!("Gateway request failed: {e}")))?;

        Self::check_delivery(response).await
    }
}
