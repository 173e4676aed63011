use crate::shared::usecase::UseCase;
use remindr_domain::Reminder;
use remindr_infra::RemindrContext;

/// Lists every reminder belonging to a user, newest fire time first.
#[derive(Debug)]
pub struct GetRemindersUseCase {
    pub user_id: String,
}

#[derive(Debug)]
pub enum UseCaseError {}

#[async_trait::async_trait(?Send)]
impl UseCase for GetRemindersUseCase {
    type Response = Vec<Reminder>;
    type Error = UseCaseError;

    const NAME: &'static str = "GetReminders";

    async fn execute(&mut self, ctx: &RemindrContext) -> Result<Self::Response, Self::Error> {
        Ok(ctx.repos.reminders.find_by_user(&self.user_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use crate::test_util::inmemory_ctx;
    use chrono::{Duration, TimeZone, Utc};
    use remindr_domain::Reminder;

    #[tokio::test]
    async fn lists_only_the_users_reminders_newest_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let ctx = inmemory_ctx(now);
        let early = Reminder::new("user-1", "early", now + Duration::hours(1), now);
        let late = Reminder::new("user-1", "late", now + Duration::hours(5), now);
        let other = Reminder::new("user-2", "other", now + Duration::hours(2), now);
        for r in [&early, &late, &other] {
            ctx.repos.reminders.insert(r).await.unwrap();
        }

        let usecase = GetRemindersUseCase {
            user_id: "user-1".into(),
        };
        let reminders = execute(usecase, &ctx).await.unwrap();
        let messages: Vec<_> = reminders.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["late", "early"]);
    }

    #[tokio::test]
    async fn unknown_user_gets_an_empty_list() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let ctx = inmemory_ctx(now);

        let usecase = GetRemindersUseCase {
            user_id: "nobody".into(),
        };
        assert!(execute(usecase, &ctx).await.unwrap().is_empty());
    }
}
