use crate::shared::entity::ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// A `Reminder` is a single scheduled notification: a short task
/// description that should be delivered to `user_id` at exactly
/// `scheduled_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ID,
    /// Opaque identifier of the recipient. One user has many reminders.
    pub user_id: String,
    /// The task description (the "crux") embedded verbatim in the
    /// delivered notification. 1-255 characters.
    pub message: String,
    /// The absolute instant at which delivery must be attempted.
    pub scheduled_time: DateTime<Utc>,
    pub status: ReminderStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Reminder {
    pub const MAX_MESSAGE_LEN: usize = 255;

    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Default::default(),
            user_id: user_id.into(),
            message: message.into(),
            scheduled_time,
            status: ReminderStatus::Pending,
            created: now,
            updated: now,
        }
    }
}

/// Lifecycle of a `Reminder` row. The row itself is only ever removed by
/// an explicit user delete; firing or expiry just moves the status to a
/// terminal state.
///
/// ```text
/// pending   --schedule ok-->         scheduled
/// pending   --schedule failed-->     failed_to_schedule
/// scheduled --fired ok-->            completed
/// scheduled --user cancels-->        cancelled
/// scheduled|pending --past due on recovery-> missed
/// scheduled|pending --exception-->   error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
    Missed,
    Error,
    FailedToSchedule,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Missed => "missed",
            Self::Error => "error",
            Self::FailedToSchedule => "failed_to_schedule",
        }
    }

    /// Terminal states end the active lifecycle of a reminder.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Scheduled)
    }

    /// Whether moving from `self` to `next` follows the state machine.
    /// Re-applying the current status is allowed so that status writes
    /// stay idempotent.
    pub fn can_transition_to(&self, next: &ReminderStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Scheduled)
                | (Self::Pending, Self::FailedToSchedule)
                | (Self::Pending, Self::Error)
                | (Self::Pending, Self::Missed)
                | (Self::Scheduled, Self::Completed)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Scheduled, Self::Missed)
                | (Self::Scheduled, Self::Error)
        )
    }
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InvalidStatusError {
    #[error("Invalid reminder status: {0}")]
    Unknown(String),
}

impl FromStr for ReminderStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "missed" => Ok(Self::Missed),
            "error" => Ok(Self::Error),
            "failed_to_schedule" => Ok(Self::FailedToSchedule),
            _ => Err(InvalidStatusError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReminderStatus::*;

    #[test]
    fn status_str_round_trip() {
        for status in [
            Pending,
            Scheduled,
            Completed,
            Cancelled,
            Missed,
            Error,
            FailedToSchedule,
        ] {
            assert_eq!(status.as_str().parse::<ReminderStatus>().unwrap(), status);
        }
        assert!("done".parse::<ReminderStatus>().is_err());
    }

    #[test]
    fn allowed_transitions() {
        assert!(Pending.can_transition_to(&Scheduled));
        assert!(Pending.can_transition_to(&FailedToSchedule));
        assert!(Pending.can_transition_to(&Error));
        assert!(Pending.can_transition_to(&Missed));
        assert!(Scheduled.can_transition_to(&Completed));
        assert!(Scheduled.can_transition_to(&Cancelled));
        assert!(Scheduled.can_transition_to(&Missed));
        assert!(Scheduled.can_transition_to(&Error));
    }

    #[test]
    fn repeated_status_is_allowed() {
        assert!(Scheduled.can_transition_to(&Scheduled));
        assert!(Completed.can_transition_to(&Completed));
    }

    #[test]
    fn terminal_states_do_not_move() {
        for terminal in [Completed, Cancelled, Missed, Error, FailedToSchedule] {
            assert!(terminal.is_terminal());
            for next in [Pending, Scheduled, Completed, Cancelled, Missed] {
                if next != terminal {
                    assert!(
                        !terminal.can_transition_to(&next),
                        "{} -> {} should be rejected",
                        terminal,
                        next
                    );
                }
            }
        }
        assert!(!Pending.is_terminal());
        assert!(!Scheduled.is_terminal());
    }

    #[test]
    fn skipping_scheduled_is_rejected() {
        assert!(!Pending.can_transition_to(&Completed));
        assert!(!Pending.can_transition_to(&Cancelled));
    }
}
