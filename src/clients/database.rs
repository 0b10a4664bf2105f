use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::{debug, error, info};

use crate::{
    engine::CampaignStore,
    models::{
        gateway::TenantChannel,
        message::{CreateMessageLog, DeliveryStatus, RecentMessage, display_excerpt},
    },
};

pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        info!("Connecting to PostgreSQL database");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        info!("PostgreSQL connection established");

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;

        info!("Database migrations applied");

        Ok(())
    }

    pub async fn recent_messages(
        &self,
        tenant_id: i64,
        limit: i64,
    ) -> Result<Vec<RecentMessage>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT recipient, content, status, created_at
            FROM message_log
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to fetch recent messages: {}", e))?;

        let messages = rows
            .into_iter()
            .map(|row| {
                let content: String = row.get("content");
                let created_at: DateTime<Utc> = row.get("created_at");

                RecentMessage {
                    contact: row.get("recipient"),
                    message: display_excerpt(&content),
                    timestamp: created_at,
                    status: row.get("status"),
                }
            })
            .collect();

        Ok(messages)
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Database health check failed: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl CampaignStore for DatabaseClient {
    async fn fetch_channel(&self, tenant_id: i64) -> Result<Option<TenantChannel>> {
        let row = sqlx::query("SELECT instance_name, api_key FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to fetch tenant channel: {}", e))?;

        Ok(row.map(|row| TenantChannel {
            instance_name: row.get("instance_name"),
            api_key: row.get("api_key"),
        }))
    }

    async fn append_message_log(&self, log: CreateMessageLog) -> Result<()> {
        let status = log.status.to_string();

        sqlx::query(
            r#"
            INSERT INTO message_log (tenant_id, recipient, content, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(log.tenant_id)
        .bind(&log.recipient)
        .bind(&log.content)
        .bind(&status)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                tenant_id = log.tenant_id,
                "Failed to write message log to database"
            );
            anyhow!("Database write failed: {}", e)
        })?;

        debug!(
            tenant_id = log.tenant_id,
            recipient = %log.recipient,
            status = %status,
            "Message log written to database"
        );

        Ok(())
    }

    async fn set_contact_status(
        &self,
        tenant_id: i64,
        phone: &str,
        status: DeliveryStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE contacts SET status = $1 WHERE tenant_id = $2 AND phone = $3")
            .bind(status.to_string())
            .bind(tenant_id)
            .bind(phone)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to update contact status: {}", e))?;

        Ok(())
    }
}
