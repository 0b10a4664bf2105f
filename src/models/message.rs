use std::fmt::{Display, Formatter, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: Uuid,
    pub tenant_id: i64,
    pub recipient: String,
    pub content: String,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageLog {
    pub tenant_id: i64,
    pub recipient: String,
    pub content: String,
    pub status: DeliveryStatus,
}

impl CreateMessageLog {
    pub fn new(tenant_id: i64, recipient: String, content: String, status: DeliveryStatus) -> Self {
        Self {
            tenant_id,
            recipient,
            content,
            status,
        }
    }
}

/// Log row shaped for the recent-messages endpoint, message text shortened
/// for display.
#[derive(Debug, Clone, Serialize)]
pub struct RecentMessage {
    pub contact: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

/// Content summary written to the message log: the rendered text, prefixed
/// with an attachment count when media was part of the send.
pub fn summarize_content(message: &str, media_count: usize) -> String {
    if media_count == 0 {
        message.to_string()
    } else {
        format!("[media: {media_count} files] {message}")
            .trim_end()
            .to_string()
    }
}

pub fn display_excerpt(content: &str) -> String {
    if content.chars().count() > 50 {
        let head: String = content.chars().take(50).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
