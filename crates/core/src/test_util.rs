use chrono::{DateTime, Utc};
use remindr_infra::{ICruxExtractor, INotifier, ISys, RemindrContext};
use std::sync::{Arc, Mutex};

/// Frozen clock for tests.
pub struct StaticSys(pub DateTime<Utc>);

impl ISys for StaticSys {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Notifier that records everything it is asked to send.
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl INotifier for RecordingNotifier {
    async fn send(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("notifier is down");
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Crux extractor that always answers with a fixed string.
pub struct StaticCrux(pub &'static str);

#[async_trait::async_trait]
impl ICruxExtractor for StaticCrux {
    async fn extract(&self, _raw_task: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Crux extractor whose backend is unreachable.
pub struct FailingCrux;

#[async_trait::async_trait]
impl ICruxExtractor for FailingCrux {
    async fn extract(&self, _raw_task: &str) -> anyhow::Result<String> {
        anyhow::bail!("crux backend unavailable")
    }
}

/// Context over in-memory repos with a clock frozen at `now`.
pub fn inmemory_ctx(now: DateTime<Utc>) -> RemindrContext {
    let mut ctx = RemindrContext::create_inmemory();
    ctx.sys = Arc::new(StaticSys(now));
    ctx
}
