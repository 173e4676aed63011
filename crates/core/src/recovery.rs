use crate::scheduler::ReminderScheduler;
use crate::SCHEDULING_GRACE_SECS;
use anyhow::Context;
use chrono::Duration;
use remindr_domain::ReminderStatus;
use remindr_infra::RemindrContext;
use tracing::{error, info};

/// Outcome of a startup recovery pass.
#[derive(Debug, Default, PartialEq)]
pub struct RecoveryReport {
    /// Rows whose fire time is still ahead and that got a fresh timer.
    pub scheduled: usize,
    /// Rows whose fire time elapsed while no process was running.
    pub missed: usize,
    /// Rows that could not be rescheduled or updated.
    pub errors: usize,
}

/// Rebuilds the in-memory timer registry from the store. Every row that
/// is still `pending` or `scheduled` either gets a new one-shot timer
/// (fire time comfortably in the future) or is marked `missed`. Failing
/// to read the backlog is fatal: starting the worker without it would
/// silently drop every reminder created before the restart.
pub async fn run_recovery(
    ctx: &RemindrContext,
    scheduler: &ReminderScheduler,
) -> anyhow::Result<RecoveryReport> {
    let backlog = ctx
        .repos
        .reminders
        .find_pending()
        .await
        .context("Unable to load pending reminders for recovery")?;
    info!("Recovering {} pending reminder(s)", backlog.len());

    let cutoff = ctx.sys.now() + Duration::seconds(SCHEDULING_GRACE_SECS);
    let mut report = RecoveryReport::default();

    for reminder in backlog {
        if reminder.scheduled_time > cutoff {
            match scheduler.schedule(&reminder).await {
                Ok(()) => report.scheduled += 1,
                Err(e) => {
                    error!("Failed to reschedule reminder {}: {:?}", reminder.id, e);
                    if let Err(e) = ctx
                        .repos
                        .reminders
                        .update_status(&reminder.id, ReminderStatus::Error)
                        .await
                    {
                        error!("Failed to mark reminder {} as error: {:?}", reminder.id, e);
                    }
                    report.errors += 1;
                }
            }
        } else {
            info!(
                "Reminder {} expired at {} during downtime, marking as missed",
                reminder.id, reminder.scheduled_time
            );
            match ctx
                .repos
                .reminders
                .update_status(&reminder.id, ReminderStatus::Missed)
                .await
            {
                Ok(()) => report.missed += 1,
                Err(e) => {
                    error!("Failed to mark reminder {} as missed: {:?}", reminder.id, e);
                    report.errors += 1;
                }
            }
        }
    }

    info!(
        "Recovery finished: {} rescheduled, {} missed, {} errors",
        report.scheduled, report.missed, report.errors
    );
    Ok(report)
}
