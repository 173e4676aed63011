use thiserror::Error;

/// User-facing failures. The `Display` text of each variant is the
/// reply sent back through the messaging transport, so it is written
/// for the end user, not for the logs.
#[derive(Error, Debug, PartialEq)]
pub enum RemindrError {
    #[error("I couldn't understand the reminder you're trying to set. Please be more specific with the time and what you want to be reminded about. E.g., 'Remind me to call mom at 3 PM tomorrow' or 'Remind me to submit report in 2 hours'.")]
    NoTimeExpressionFound,
    #[error("What should I remind you about? Please provide the text for the reminder. E.g., 'Remind me to buy milk tomorrow at 8 AM'")]
    NoTaskDescription,
    #[error("I can only set reminders for future times. The time you provided seems to be in the past or too soon relative to your timezone ({0}). Please specify a future time.")]
    PastOrTooSoon(String),
    #[error("That reminder text is too long. Please keep it under {0} characters.")]
    MessageTooLong(usize),
    #[error("No reminder found with ID starting with '{0}' for your account. Please check the ID from 'list reminders'.")]
    ReminderNotFound(String),
    #[error("Sorry, I couldn't schedule your reminder due to an internal error. Please try again later.")]
    InternalError,
}
