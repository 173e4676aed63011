use super::IReminderRepo;

use chrono::Utc;
use remindr_domain::{Reminder, ReminderStatus, ID};
use std::sync::Mutex;
use tracing::warn;

/// Reminder repo backed by a `Vec`, used in tests.
pub struct InMemoryReminderRepo {
    reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryReminderRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let mut reminders = self.reminders.lock().unwrap();
        if reminders.iter().any(|r| r.id == reminder.id) {
            anyhow::bail!("Reminder with id {} already exists", reminder.id);
        }
        reminders.push(reminder.clone());
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        let reminders = self.reminders.lock().unwrap();
        reminders.iter().find(|r| &r.id == reminder_id).cloned()
    }

    async fn find_by_user(&self, user_id: &str) -> Vec<Reminder> {
        let reminders = self.reminders.lock().unwrap();
        let mut found: Vec<Reminder> = reminders
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.scheduled_time.cmp(&a.scheduled_time));
        found
    }

    async fn find_pending(&self) -> anyhow::Result<Vec<Reminder>> {
        let reminders = self.reminders.lock().unwrap();
        Ok(reminders
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    ReminderStatus::Pending | ReminderStatus::Scheduled
                )
            })
            .cloned()
            .collect())
    }

    async fn update_status(&self, reminder_id: &ID, status: ReminderStatus) -> anyhow::Result<()> {
        let mut reminders = self.reminders.lock().unwrap();
        if let Some(reminder) = reminders.iter_mut().find(|r| &r.id == reminder_id) {
            if !reminder.status.can_transition_to(&status) {
                warn!(
                    "Ignoring illegal status transition {} -> {} for reminder {}",
                    reminder.status, status, reminder_id
                );
                return Ok(());
            }
            reminder.status = status;
            reminder.updated = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, reminder_id: &ID) -> Option<Reminder> {
        let mut reminders = self.reminders.lock().unwrap();
        let index = reminders.iter().position(|r| &r.id == reminder_id)?;
        Some(reminders.remove(index))
    }
}
