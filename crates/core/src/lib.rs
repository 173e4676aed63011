mod error;
mod recovery;
mod reminder;
mod scheduler;
mod shared;
#[cfg(test)]
pub(crate) mod test_util;
mod time_resolver;

pub use error::RemindrError;
pub use recovery::{run_recovery, RecoveryReport};
pub use reminder::create_reminder::{CreateReminderUseCase, CreatedReminder};
pub use reminder::delete_reminder::DeleteReminderUseCase;
pub use reminder::get_reminders::GetRemindersUseCase;
pub use scheduler::ReminderScheduler;
pub use shared::usecase::{execute, UseCase};
pub use time_resolver::{ResolvedReminder, TimeResolveError, TimeResolver};

/// Grace buffer in seconds: a reminder must fire strictly later than
/// now plus this buffer, both at creation time and during recovery.
pub const SCHEDULING_GRACE_SECS: i64 = 10;
