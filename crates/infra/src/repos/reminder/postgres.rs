use super::IReminderRepo;

use chrono::{DateTime, Utc};
use remindr_domain::{Reminder, ReminderStatus, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::{error, warn};

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    id: Uuid,
    user_id: String,
    message: String,
    scheduled_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReminderRaw> for Reminder {
    fn from(raw: ReminderRaw) -> Self {
        Self {
            id: ID::from(raw.id),
            user_id: raw.user_id,
            message: raw.message,
            scheduled_time: raw.scheduled_time,
            // Rows are only ever written with statuses produced by
            // ReminderStatus::as_str, so a parse failure means the row
            // was tampered with. Surface it as the error state.
            status: raw
                .status
                .parse::<ReminderStatus>()
                .unwrap_or(ReminderStatus::Error),
            created: raw.created_at,
            updated: raw.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminders
            (id, user_id, message, scheduled_time, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*reminder.id.inner_ref())
        .bind(&reminder.user_id)
        .bind(&reminder.message)
        .bind(reminder.scheduled_time)
        .bind(reminder.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders
            WHERE id = $1
            "#,
        )
        .bind(*reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Find reminder {} failed: {:?}", reminder_id, e);
            None
        })
        .map(|raw| raw.into())
    }

    async fn find_by_user(&self, user_id: &str) -> Vec<Reminder> {
        sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders
            WHERE user_id = $1
            ORDER BY scheduled_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Find reminders for user {} failed: {:?}", user_id, e);
            Vec::new()
        })
        .into_iter()
        .map(|raw| raw.into())
        .collect()
    }

    async fn find_pending(&self) -> anyhow::Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders
            WHERE status = 'pending' OR status = 'scheduled'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|raw| raw.into()).collect())
    }

    async fn update_status(&self, reminder_id: &ID, status: ReminderStatus) -> anyhow::Result<()> {
        let current: Option<String> = sqlx::query_scalar(
            r#"
            SELECT status FROM reminders
            WHERE id = $1
            "#,
        )
        .bind(*reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;
        let Some(current) = current else {
            return Ok(());
        };
        let current = current
            .parse::<ReminderStatus>()
            .unwrap_or(ReminderStatus::Error);
        if !current.can_transition_to(&status) {
            warn!(
                "Ignoring illegal status transition {} -> {} for reminder {}",
                current, status, reminder_id
            );
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE reminders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(*reminder_id.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, reminder_id: &ID) -> Option<Reminder> {
        sqlx::query_as::<_, ReminderRaw>(
            r#"
            DELETE FROM reminders
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(*reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Delete reminder {} failed: {:?}", reminder_id, e);
            None
        })
        .map(|raw| raw.into())
    }
}
