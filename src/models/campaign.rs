use std::fmt::{Display, Formatter, Result};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::media::MediaPayload;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRecipient {
    pub phone: String,

    #[serde(default)]
    pub name: String,
}

/// One unit of work for the dispatcher. The generation stamp identifies
/// which campaign the task belongs to; tasks whose generation no longer
/// matches the tenant's live status entry are dropped without sending.
#[derive(Debug, Clone)]
pub struct CampaignTask {
    pub tenant_id: i64,
    pub generation: u64,
    pub recipient: String,
    pub rendered_message: String,
    pub media: Arc<[MediaPayload]>,
    pub delay_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignState {
    None,
    Running,
    Stopped,
    Completed,
}

impl Display for CampaignState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            CampaignState::None => write!(f, "none"),
            CampaignState::Running => write!(f, "running"),
            CampaignState::Stopped => write!(f, "stopped"),
            CampaignState::Completed => write!(f, "completed"),
        }
    }
}

/// Tracking entry for the most recent campaign of one tenant. Mutated only
/// under the engine's status lock.
#[derive(Debug, Clone)]
pub struct CampaignStatus {
    pub state: CampaignState,
    pub generation: u64,
    pub total: u64,
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
    pub started_at: DateTime<Utc>,
    pub started_instant: Instant,
    pub delay_seconds: u64,
}

impl CampaignStatus {
    /// Snapshot with derived percentage and ETA for the progress endpoint.
    pub fn view(&self) -> ProgressView {
        let percentage = if self.total > 0 {
            ((self.processed as f64 / self.total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let eta_seconds = if self.state == CampaignState::Running && self.processed > 0 {
            let elapsed = self.started_instant.elapsed().as_secs_f64();
            let rate = self.processed as f64 / elapsed;
            if rate > 0.0 {
                ((self.total - self.processed) as f64 / rate).round() as u64
            } else {
                0
            }
        } else {
            0
        };

        ProgressView {
            state: self.state,
            total: self.total,
            processed: self.processed,
            sent: self.sent,
            failed: self.failed,
            percentage,
            eta_seconds,
            delay_seconds: self.delay_seconds,
            started_at: Some(self.started_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub state: CampaignState,
    pub total: u64,
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
    pub percentage: f64,
    pub eta_seconds: u64,
    pub delay_seconds: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl ProgressView {
    /// Zero view returned when a tenant has never started a campaign.
    pub fn none() -> Self {
        Self {
            state: CampaignState::None,
            total: 0,
            processed: 0,
            sent: 0,
            failed: 0,
            percentage: 0.0,
            eta_seconds: 0,
            delay_seconds: 0,
            started_at: None,
        }
    }
}
