pub mod create_reminder;
pub mod delete_reminder;
pub mod get_reminders;
