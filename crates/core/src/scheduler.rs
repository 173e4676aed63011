use remindr_domain::{Reminder, ReminderStatus, ID};
use remindr_infra::{INotifier, IReminderRepo, ISys};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// In-memory registry of pending deliveries. Each reminder id maps to
/// at most one live one-shot timer task; the map is the single source
/// of truth for "is this delivery still pending in this process". The
/// map does not survive a restart - the recovery pass rebuilds it from
/// the store.
#[derive(Clone)]
pub struct ReminderScheduler {
    jobs: Arc<Mutex<HashMap<ID, JoinHandle<()>>>>,
    repo: Arc<dyn IReminderRepo>,
    notifier: Arc<dyn INotifier>,
    sys: Arc<dyn ISys>,
}

impl ReminderScheduler {
    pub fn new(
        repo: Arc<dyn IReminderRepo>,
        notifier: Arc<dyn INotifier>,
        sys: Arc<dyn ISys>,
    ) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            repo,
            notifier,
            sys,
        }
    }

    /// Installs a one-shot delivery task for the reminder and moves it
    /// to `scheduled`. Idempotent per id: an existing task for the same
    /// reminder is stopped and replaced, so calling this twice (e.g. on
    /// a retry) never produces a duplicate delivery.
    pub async fn schedule(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let until_fire = match (reminder.scheduled_time - self.sys.now()).to_std() {
            Ok(d) => d,
            Err(_) => {
                warn!(
                    "Fire time {} of reminder {} is already past, refusing to schedule",
                    reminder.scheduled_time, reminder.id
                );
                if let Err(e) = self
                    .repo
                    .update_status(&reminder.id, ReminderStatus::Error)
                    .await
                {
                    error!("Failed to mark reminder {} as error: {:?}", reminder.id, e);
                }
                anyhow::bail!(
                    "cannot schedule reminder {} at past fire time {}",
                    reminder.id,
                    reminder.scheduled_time
                );
            }
        };
        let deadline = Instant::now() + until_fire;

        let job = self.spawn_delivery(reminder.clone(), deadline);
        if let Some(previous) = self.jobs.lock().unwrap().insert(reminder.id.clone(), job) {
            previous.abort();
            info!("Stopped existing job for reminder {}", reminder.id);
        }

        if let Err(e) = self
            .repo
            .update_status(&reminder.id, ReminderStatus::Scheduled)
            .await
        {
            // Without the status write the store would disagree with
            // the in-memory schedule, so the fresh handle goes too.
            if let Some(job) = self.jobs.lock().unwrap().remove(&reminder.id) {
                job.abort();
            }
            return Err(e);
        }

        info!(
            "Scheduled reminder {} to fire at {} (in {:?})",
            reminder.id, reminder.scheduled_time, until_fire
        );
        Ok(())
    }

    fn spawn_delivery(&self, reminder: Reminder, deadline: Instant) -> JoinHandle<()> {
        let jobs = Arc::clone(&self.jobs);
        let repo = Arc::clone(&self.repo);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            // Claim the delivery by removing our own map entry. Whoever
            // removes the entry owns the only attempt, so a cancel
            // racing this callback finds nothing and reports false.
            if jobs.lock().unwrap().remove(&reminder.id).is_none() {
                return;
            }

            info!(
                "Executing reminder {} for user {}: {}",
                reminder.id, reminder.user_id, reminder.message
            );
            let notification = format!(
                "*Here's the reminder you scheduled:*\n\n{}",
                reminder.message
            );
            let status = match notifier.send(&reminder.user_id, &notification).await {
                Ok(()) => ReminderStatus::Completed,
                Err(e) => {
                    // The fire attempt has happened; the row must still
                    // leave `scheduled` so it is never stuck "about to
                    // fire" forever.
                    error!("Failed to deliver reminder {}: {:?}", reminder.id, e);
                    ReminderStatus::Error
                }
            };
            if let Err(e) = repo.update_status(&reminder.id, status).await {
                error!(
                    "Failed to update status of reminder {} after firing: {:?}",
                    reminder.id, e
                );
            }
        })
    }

    /// Stops and removes the delivery task for the reminder, if one is
    /// still pending, and moves the row to `cancelled`. Returns whether
    /// a task was found; an already-fired or never-scheduled reminder
    /// yields `false` without error.
    pub async fn cancel(&self, reminder_id: &ID) -> bool {
        let job = self.jobs.lock().unwrap().remove(reminder_id);
        match job {
            Some(job) => {
                job.abort();
                if let Err(e) = self
                    .repo
                    .update_status(reminder_id, ReminderStatus::Cancelled)
                    .await
                {
                    error!(
                        "Failed to mark reminder {} as cancelled: {:?}",
                        reminder_id, e
                    );
                }
                info!("Cancelled reminder job for id {}", reminder_id);
                true
            }
            None => {
                info!("No active job found to cancel for reminder {}", reminder_id);
                false
            }
        }
    }

    pub fn has_job(&self, reminder_id: &ID) -> bool {
        self.jobs.lock().unwrap().contains_key(reminder_id)
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{RecordingNotifier, StaticSys};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use remindr_infra::InMemoryReminderRepo;
    use std::time::Duration;

    struct TestBed {
        repo: Arc<InMemoryReminderRepo>,
        notifier: Arc<RecordingNotifier>,
        scheduler: ReminderScheduler,
        now: chrono::DateTime<Utc>,
    }

    fn setup(notifier: RecordingNotifier) -> TestBed {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let repo = Arc::new(InMemoryReminderRepo::new());
        let notifier = Arc::new(notifier);
        let scheduler = ReminderScheduler::new(
            repo.clone(),
            notifier.clone(),
            Arc::new(StaticSys(now)),
        );
        TestBed {
            repo,
            notifier,
            scheduler,
            now,
        }
    }

    async fn insert_reminder(bed: &TestBed, offset_secs: i64) -> Reminder {
        let reminder = Reminder::new(
            "user-1",
            "call Vaibhav",
            bed.now + ChronoDuration::seconds(offset_secs),
            bed.now,
        );
        bed.repo.insert(&reminder).await.unwrap();
        reminder
    }

    /// Let spawned delivery tasks run to completion.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_and_completes() {
        let bed = setup(RecordingNotifier::new());
        let reminder = insert_reminder(&bed, 60).await;

        bed.scheduler.schedule(&reminder).await.unwrap();
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Scheduled
        );
        assert!(bed.scheduler.has_job(&reminder.id));

        tokio::time::sleep(Duration::from_secs(61)).await;
        settle().await;

        let sent = bed.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "user-1");
        // The stored message is embedded verbatim.
        assert!(sent[0].1.contains("call Vaibhav"));
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Completed
        );
        assert!(!bed.scheduler.has_job(&reminder.id));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_twice_keeps_one_job_and_one_delivery() {
        let bed = setup(RecordingNotifier::new());
        let reminder = insert_reminder(&bed, 60).await;

        bed.scheduler.schedule(&reminder).await.unwrap();
        bed.scheduler.schedule(&reminder).await.unwrap();
        assert_eq!(bed.scheduler.active_jobs(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(bed.notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_job() {
        let bed = setup(RecordingNotifier::new());
        let reminder = insert_reminder(&bed, 60).await;
        bed.scheduler.schedule(&reminder).await.unwrap();

        assert!(bed.scheduler.cancel(&reminder.id).await);
        assert!(!bed.scheduler.has_job(&reminder.id));
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Cancelled
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert!(bed.notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_returns_false() {
        let bed = setup(RecordingNotifier::new());
        let reminder = insert_reminder(&bed, 30).await;
        bed.scheduler.schedule(&reminder).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(bed.notifier.sent().len(), 1);

        assert!(!bed.scheduler.cancel(&reminder.id).await);
        // The fired status is not overwritten by the late cancel.
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_past_fire_times() {
        let bed = setup(RecordingNotifier::new());
        let reminder = insert_reminder(&bed, -3600).await;

        assert!(bed.scheduler.schedule(&reminder).await.is_err());
        assert!(!bed.scheduler.has_job(&reminder.id));
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Error
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_marks_error() {
        let bed = setup(RecordingNotifier::failing());
        let reminder = insert_reminder(&bed, 30).await;
        bed.scheduler.schedule(&reminder).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;

        assert!(!bed.scheduler.has_job(&reminder.id));
        assert_eq!(
            bed.repo.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Error
        );
    }
}
