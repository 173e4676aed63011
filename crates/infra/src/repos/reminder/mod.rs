mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderRepo;
pub use postgres::PostgresReminderRepo;
use remindr_domain::{Reminder, ReminderStatus, ID};

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    /// Inserts a new reminder row. The row is stored with whatever
    /// status the reminder carries, which is `pending` for new ones.
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()>;
    async fn find(&self, reminder_id: &ID) -> Option<Reminder>;
    /// All reminders for a user, newest `scheduled_time` first.
    async fn find_by_user(&self, user_id: &str) -> Vec<Reminder>;
    /// The recovery set: every row still in `pending` or `scheduled`.
    /// Fallible because a failure here must abort startup instead of
    /// looking like an empty schedule.
    async fn find_pending(&self) -> anyhow::Result<Vec<Reminder>>;
    /// Sets the status and refreshes `updated_at`. Idempotent: setting
    /// the same status twice is not an error. A write that does not
    /// follow `ReminderStatus::can_transition_to` is logged and skipped,
    /// so a terminal row can never move again.
    async fn update_status(&self, reminder_id: &ID, status: ReminderStatus) -> anyhow::Result<()>;
    async fn delete(&self, reminder_id: &ID) -> Option<Reminder>;
}
