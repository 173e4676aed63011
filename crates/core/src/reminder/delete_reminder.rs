use crate::error::RemindrError;
use crate::scheduler::ReminderScheduler;
use crate::shared::usecase::UseCase;
use remindr_domain::Reminder;
use remindr_infra::RemindrContext;
use tracing::info;

/// Deletes a reminder identified by an id prefix, scoped to the owning
/// user. Users refer to reminders by the short prefix shown in the
/// creation confirmation, so the prefix is matched against the user's
/// own reminders only. Any still-pending timer is stopped first.
pub struct DeleteReminderUseCase {
    pub user_id: String,
    pub reminder_id: String,
    pub scheduler: ReminderScheduler,
}

impl std::fmt::Debug for DeleteReminderUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteReminderUseCase")
            .field("user_id", &self.user_id)
            .field("reminder_id", &self.reminder_id)
            .finish()
    }
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(String),
}

impl From<UseCaseError> for RemindrError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(prefix) => RemindrError::ReminderNotFound(prefix),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteReminderUseCase {
    type Response = Reminder;
    type Error = UseCaseError;

    const NAME: &'static str = "DeleteReminder";

    async fn execute(&mut self, ctx: &RemindrContext) -> Result<Self::Response, Self::Error> {
        let prefix = self.reminder_id.trim();
        // An empty prefix would match every reminder the user has.
        if prefix.is_empty() {
            return Err(UseCaseError::NotFound(self.reminder_id.clone()));
        }

        let reminder = ctx
            .repos
            .reminders
            .find_by_user(&self.user_id)
            .await
            .into_iter()
            .find(|r| r.id.as_string().starts_with(prefix))
            .ok_or_else(|| UseCaseError::NotFound(prefix.to_string()))?;

        let had_job = self.scheduler.cancel(&reminder.id).await;
        let deleted = ctx
            .repos
            .reminders
            .delete(&reminder.id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(prefix.to_string()))?;

        info!(
            "Deleted reminder {} for user {} (cancelled pending job: {})",
            deleted.id, deleted.user_id, had_job
        );
        Ok(deleted)
    }
}
