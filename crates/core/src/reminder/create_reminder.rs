use crate::error::RemindrError;
use crate::scheduler::ReminderScheduler;
use crate::shared::usecase::UseCase;
use crate::time_resolver::{TimeResolveError, TimeResolver};
use remindr_domain::{Reminder, ReminderStatus};
use remindr_infra::RemindrContext;
use tracing::{error, info};

/// Resolves a free-form reminder request, persists it and installs the
/// delivery timer. The row is inserted before the timer so that a crash
/// in between is recoverable; if the timer cannot be installed the row
/// is removed again (or marked `failed_to_schedule` when even the
/// removal fails).
pub struct CreateReminderUseCase {
    pub user_id: String,
    pub message: String,
    pub scheduler: ReminderScheduler,
    pub resolver: TimeResolver,
}

impl std::fmt::Debug for CreateReminderUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateReminderUseCase")
            .field("user_id", &self.user_id)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedReminder {
    pub reminder: Reminder,
    /// Confirmation text to send back to the requesting user.
    pub confirmation: String,
}

#[derive(Debug)]
pub enum UseCaseError {
    NoTimeExpressionFound,
    NoTaskDescription,
    PastOrTooSoon,
    MessageTooLong(usize),
    StorageError,
    SchedulingError,
}

impl From<TimeResolveError> for UseCaseError {
    fn from(e: TimeResolveError) -> Self {
        match e {
            TimeResolveError::NoTimeExpressionFound => Self::NoTimeExpressionFound,
            TimeResolveError::NoTaskDescription => Self::NoTaskDescription,
            TimeResolveError::PastOrTooSoon => Self::PastOrTooSoon,
        }
    }
}

impl CreateReminderUseCase {
    pub fn to_remindr_error(&self, e: UseCaseError) -> RemindrError {
        match e {
            UseCaseError::NoTimeExpressionFound => RemindrError::NoTimeExpressionFound,
            UseCaseError::NoTaskDescription => RemindrError::NoTaskDescription,
            UseCaseError::PastOrTooSoon => {
                RemindrError::PastOrTooSoon(self.resolver.timezone().name().to_string())
            }
            UseCaseError::MessageTooLong(max) => RemindrError::MessageTooLong(max),
            UseCaseError::StorageError | UseCaseError::SchedulingError => {
                RemindrError::InternalError
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateReminderUseCase {
    type Response = CreatedReminder;
    type Error = UseCaseError;

    const NAME: &'static str = "CreateReminder";

    async fn execute(&mut self, ctx: &RemindrContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let resolved = self.resolver.resolve(&self.message, now).await?;

        if resolved.task_text.chars().count() > Reminder::MAX_MESSAGE_LEN {
            return Err(UseCaseError::MessageTooLong(Reminder::MAX_MESSAGE_LEN));
        }

        let reminder = Reminder::new(&self.user_id, &resolved.task_text, resolved.fire_time, now);
        ctx.repos
            .reminders
            .insert(&reminder)
            .await
            .map_err(|e| {
                error!("Failed to insert reminder: {:?}", e);
                UseCaseError::StorageError
            })?;

        if let Err(e) = self.scheduler.schedule(&reminder).await {
            error!(
                "Failed to schedule reminder {}, undoing the insert: {:?}",
                reminder.id, e
            );
            if ctx.repos.reminders.delete(&reminder.id).await.is_none() {
                // The row could not be removed; leave a breadcrumb so it
                // is never picked up as pending by a later recovery.
                if let Err(e) = ctx
                    .repos
                    .reminders
                    .update_status(&reminder.id, ReminderStatus::FailedToSchedule)
                    .await
                {
                    error!(
                        "Failed to mark reminder {} as failed_to_schedule: {:?}",
                        reminder.id, e
                    );
                }
            }
            return Err(UseCaseError::SchedulingError);
        }

        let local = reminder
            .scheduled_time
            .with_timezone(&self.resolver.timezone());
        let confirmation = format!(
            "📌 Reminder set for {}:\n\n\"{}\"\n\nID: {}",
            local.format("%A, %B %-d at %-I:%M %p %Z"),
            reminder.message,
            &reminder.id.as_string()[..8]
        );
        info!(
            "Created reminder {} for user {} firing at {}",
            reminder.id, reminder.user_id, reminder.scheduled_time
        );

        Ok(CreatedReminder {
            reminder,
            confirmation,
        })
    }
}
