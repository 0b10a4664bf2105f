use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{
    sync::{mpsc, watch},
    time::{Duration, Instant, sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    error::EngineError,
    models::{
        campaign::{CampaignState, CampaignStatus, CampaignTask, ContactRecipient, ProgressView},
        gateway::{DeliveryFailure, TenantChannel},
        media::MediaPayload,
        message::{CreateMessageLog, DeliveryStatus, summarize_content},
    },
};

const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const INTER_MEDIA_DELAY: Duration = Duration::from_secs(1);

/// Outbound send capability. One WhatsApp connection per tenant; expected
/// delivery failures come back as values, never as panics.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(
        &self,
        channel: &TenantChannel,
        recipient: &str,
        text: &str,
    ) -> Result<(), DeliveryFailure>;

    async fn send_media(
        &self,
        channel: &TenantChannel,
        recipient: &str,
        media: &MediaPayload,
        caption: &str,
    ) -> Result<(), DeliveryFailure>;
}

/// Persistence collaborator: tenant channel lookup plus the best-effort
/// side effects of each dispatched task.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn fetch_channel(&self, tenant_id: i64) -> anyhow::Result<Option<TenantChannel>>;

    async fn append_message_log(&self, log: CreateMessageLog) -> anyhow::Result<()>;

    async fn set_contact_status(
        &self,
        tenant_id: i64,
        phone: &str,
        status: DeliveryStatus,
    ) -> anyhow::Result<()>;
}

type StatusTable = Arc<Mutex<HashMap<i64, CampaignStatus>>>;

/// Campaign dispatch engine: owns the process-wide task queue and the
/// per-tenant status table. Constructed once at startup; request handlers
/// share it behind an Arc while the paired Dispatcher drains the queue.
pub struct CampaignEngine {
    tasks: mpsc::UnboundedSender<CampaignTask>,
    table: StatusTable,
}

impl CampaignEngine {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        store: Arc<dyn CampaignStore>,
        shutdown: watch::Receiver<bool>,
    ) -> (Arc<Self>, Dispatcher) {
        let (tasks, queue) = mpsc::unbounded_channel();
        let table: StatusTable = Arc::new(Mutex::new(HashMap::new()));

        let engine = Arc::new(Self {
            tasks,
            table: Arc::clone(&table),
        });

        let dispatcher = Dispatcher {
            queue,
            table,
            sender,
            store,
            shutdown,
        };

        (engine, dispatcher)
    }

    /// Validates the request, installs a fresh Running status for the tenant
    /// (bumping its generation so tasks of any earlier campaign become
    /// stale), renders one task per contact and enqueues them in input
    /// order. Returns a queued-count summary without waiting on delivery.
    pub fn start(
        &self,
        tenant_id: i64,
        contacts: &[ContactRecipient],
        message_template: &str,
        delay_seconds: u64,
        media: Vec<MediaPayload>,
    ) -> Result<String, EngineError> {
        if contacts.is_empty() {
            return Err(EngineError::InvalidCampaignRequest(
                "No contacts provided".to_string(),
            ));
        }

        if message_template.trim().is_empty() && media.is_empty() {
            return Err(EngineError::InvalidCampaignRequest(
                "Either a message or media files are required".to_string(),
            ));
        }

        let media: Arc<[MediaPayload]> = media.into();

        let generation = {
            let mut table = self.lock_table();
            let generation = table
                .get(&tenant_id)
                .map(|status| status.generation + 1)
                .unwrap_or(1);

            table.insert(
                tenant_id,
                CampaignStatus {
                    state: CampaignState::Running,
                    generation,
                    total: contacts.len() as u64,
                    processed: 0,
                    sent: 0,
                    failed: 0,
                    started_at: Utc::now(),
                    started_instant: Instant::now(),
                    delay_seconds,
                },
            );

            generation
        };

        info!(
            tenant_id,
            generation,
            contacts = contacts.len(),
            media_files = media.len(),
            delay_seconds,
            "Campaign started"
        );

        for contact in contacts {
            let rendered_message = if message_template.is_empty() {
                String::new()
            } else {
                personalize_message(message_template, &contact.name, &contact.phone)
            };

            let task = CampaignTask {
                tenant_id,
                generation,
                recipient: contact.phone.clone(),
                rendered_message,
                media: Arc::clone(&media),
                delay_seconds,
            };

            if self.tasks.send(task).is_err() {
                warn!(tenant_id, "Dispatcher is gone, dropping remaining campaign tasks");
                break;
            }
        }

        let summary = if media.is_empty() {
            format!(
                "Campaign started! {} messages queued for processing.",
                contacts.len()
            )
        } else {
            format!(
                "Campaign started! {} messages with {} media files queued for processing.",
                contacts.len(),
                media.len()
            )
        };

        Ok(summary)
    }

    /// Snapshot of the tenant's campaign progress. Never blocks on delivery;
    /// a tenant with no campaign history gets a zero view.
    pub fn progress(&self, tenant_id: i64) -> ProgressView {
        let table = self.lock_table();

        table
            .get(&tenant_id)
            .map(CampaignStatus::view)
            .unwrap_or_else(ProgressView::none)
    }

    /// Marks the tenant's running campaign as stopped. Queued tasks are not
    /// purged; the dispatcher drops them when it sees the stopped state.
    pub fn stop(&self, tenant_id: i64) -> Result<String, EngineError> {
        let mut table = self.lock_table();

        match table.get_mut(&tenant_id) {
            Some(status) if status.state == CampaignState::Running => {
                status.state = CampaignState::Stopped;
                info!(tenant_id, generation = status.generation, "Campaign stopped");
                Ok("Campaign stopped".to_string())
            }
            _ => Err(EngineError::NoActiveCampaign),
        }
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<i64, CampaignStatus>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Substitutes `{name}` and `{phone}` in the template. A missing or blank
/// contact name falls back to a generic token; unknown placeholders are left
/// verbatim.
pub fn personalize_message(template: &str, name: &str, phone: &str) -> String {
    let name = if name.trim().is_empty() { "User" } else { name };

    template.replace("{name}", name).replace("{phone}", phone)
}

/// Single background worker draining the task queue for the process
/// lifetime. Strictly serial delivery: one task in flight at a time, with a
/// per-campaign throttle sleep between sends.
pub struct Dispatcher {
    queue: mpsc::UnboundedReceiver<CampaignTask>,
    table: StatusTable,
    sender: Arc<dyn MessageSender>,
    store: Arc<dyn CampaignStore>,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    pub async fn run(mut self) {
        info!("Campaign dispatcher started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // Bounded poll so the shutdown flag is observed within a second
            // even while the queue is empty.
            let task = match timeout(QUEUE_POLL_INTERVAL, self.queue.recv()).await {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(_) => continue,
            };

            if !self.claim(&task) {
                debug!(
                    tenant_id = task.tenant_id,
                    recipient = %task.recipient,
                    generation = task.generation,
                    "Dropping stale task"
                );
                continue;
            }

            let outcome = self.deliver(&task).await;
            self.record(&task, &outcome);
            self.persist_outcome(&task, &outcome).await;

            // Throttle between sends; this bounds the outbound rate.
            if task.delay_seconds > 0 {
                sleep(Duration::from_secs(task.delay_seconds)).await;
            }
        }

        info!("Campaign dispatcher stopped");
    }

    /// A task is live only while its campaign is still the tenant's current
    /// one and still running. Anything else is dropped without touching the
    /// counters.
    fn claim(&self, task: &CampaignTask) -> bool {
        let table = self.lock_table();

        match table.get(&task.tenant_id) {
            Some(status) => {
                status.generation == task.generation && status.state == CampaignState::Running
            }
            None => false,
        }
    }

    /// The outbound call, made outside the status lock. Channel resolution
    /// errors and gateway rejections both fold into a delivery failure; this
    /// never brings the loop down.
    async fn deliver(&self, task: &CampaignTask) -> Result<(), DeliveryFailure> {
        let channel = match self.store.fetch_channel(task.tenant_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                return Err(DeliveryFailure::new(
                    "No gateway instance registered for tenant",
                ));
            }
            Err(e) => return Err(DeliveryFailure::new(format!("Channel lookup failed: {e}"))),
        };

        deliver_message(
            self.sender.as_ref(),
            &channel,
            &task.recipient,
            &task.rendered_message,
            &task.media,
        )
        .await
    }

    fn record(&self, task: &CampaignTask, outcome: &Result<(), DeliveryFailure>) {
        let mut table = self.lock_table();

        let Some(status) = table.get_mut(&task.tenant_id) else {
            return;
        };

        // The campaign was overwritten while this task was in flight; its
        // outcome must not pollute the new campaign's counters.
        if status.generation != task.generation {
            return;
        }

        match outcome {
            Ok(()) => status.sent += 1,
            Err(_) => status.failed += 1,
        }
        status.processed += 1;

        if status.processed >= status.total && status.state == CampaignState::Running {
            status.state = CampaignState::Completed;
            info!(
                tenant_id = task.tenant_id,
                sent = status.sent,
                failed = status.failed,
                "Campaign completed"
            );
        }
    }

    async fn persist_outcome(&self, task: &CampaignTask, outcome: &Result<(), DeliveryFailure>) {
        let status = match outcome {
            Ok(()) => DeliveryStatus::Sent,
            Err(failure) => {
                warn!(
                    tenant_id = task.tenant_id,
                    recipient = %task.recipient,
                    reason = %failure,
                    "Message delivery failed"
                );
                DeliveryStatus::Failed
            }
        };

        let content = summarize_content(&task.rendered_message, task.media.len());
        let log = CreateMessageLog::new(task.tenant_id, task.recipient.clone(), content, status);

        if let Err(e) = self.store.append_message_log(log).await {
            warn!(error = %e, tenant_id = task.tenant_id, "Failed to write message log");
        }

        if status == DeliveryStatus::Sent {
            if let Err(e) = self
                .store
                .set_contact_status(task.tenant_id, &task.recipient, DeliveryStatus::Sent)
                .await
            {
                warn!(error = %e, tenant_id = task.tenant_id, "Failed to update contact status");
            }
        }
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<i64, CampaignStatus>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared send routine for queued tasks and immediate single sends. Text
/// goes out as one message; attachments go out sequentially with the text
/// riding as the caption of the first one. Delivery counts as a success if
/// at least one attachment made it through.
pub async fn deliver_message(
    sender: &dyn MessageSender,
    channel: &TenantChannel,
    recipient: &str,
    text: &str,
    media: &[MediaPayload],
) -> Result<(), DeliveryFailure> {
    if media.is_empty() {
        return sender.send_text(channel, recipient, text).await;
    }

    let mut delivered = 0usize;
    let mut last_failure = None;

    for (index, payload) in media.iter().enumerate() {
        let caption = if index == 0 { text } else { "" };

        match sender.send_media(channel, recipient, payload, caption).await {
            Ok(()) => delivered += 1,
            Err(failure) => {
                warn!(
                    recipient,
                    filename = %payload.filename,
                    reason = %failure,
                    "Media file delivery failed"
                );
                last_failure = Some(failure);
            }
        }

        // Pause between attachments to avoid gateway rate limiting.
        if index + 1 < media.len() {
            sleep(INTER_MEDIA_DELAY).await;
        }
    }

    if delivered > 0 {
        Ok(())
    } else {
        Err(last_failure
            .unwrap_or_else(|| DeliveryFailure::new("No media files were delivered")))
    }
}
