use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Routing handle for one tenant's WhatsApp connection on the gateway.
#[derive(Debug, Clone)]
pub struct TenantChannel {
    pub instance_name: String,
    pub api_key: Option<String>,
}

/// An expected, non-fatal delivery failure: auth expired, invalid recipient,
/// network timeout, gateway rejection. Counted and logged, never propagated
/// out of the dispatcher.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct DeliveryFailure {
    pub reason: String,
}

impl DeliveryFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTextRequest {
    pub number: String,

    #[serde(rename = "textMessage")]
    pub text_message: TextMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextMessage {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMediaRequest {
    pub number: String,

    #[serde(rename = "mediaMessage")]
    pub media_message: MediaMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaMessage {
    pub mediatype: String,
    pub media: String,
    pub caption: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionStateResponse {
    #[serde(default)]
    pub instance: InstanceState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionState {
    pub state: String,
    pub connected: bool,
}
