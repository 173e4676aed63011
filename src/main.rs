mod telemetry;

use remindr_core::{run_recovery, ReminderScheduler};
use remindr_infra::{run_migration, setup_context, WhatsAppNotifier};
use std::sync::Arc;
use telemetry::{get_subscriber, init_subscriber};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("remindr_worker".into(), "info".into());
    init_subscriber(subscriber);

    run_migration().await?;
    let context = setup_context().await;

    let notifier = Arc::new(WhatsAppNotifier::new(&context.config));
    let scheduler = ReminderScheduler::new(
        context.repos.reminders.clone(),
        notifier,
        context.sys.clone(),
    );

    // Timers live in process memory only, so every start begins with a
    // recovery pass over the store. Failing it means running blind over
    // an unknown backlog, so it aborts the start.
    let report = run_recovery(&context, &scheduler).await?;
    info!(
        "Reminder worker started: {} reminder(s) rescheduled, {} missed during downtime, {} errors",
        report.scheduled, report.missed, report.errors
    );

    shutdown_signal().await;
    info!(
        "Shutting down with {} reminder job(s) still pending",
        scheduler.active_jobs()
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
