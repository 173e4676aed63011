mod gemini;
mod whatsapp;

pub use gemini::GeminiCruxExtractor;
pub use whatsapp::WhatsAppNotifier;

/// Delivers the final notification text to a user through the
/// messaging transport.
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> anyhow::Result<()>;
}

/// Extracts the concise task description (the "crux") from a raw
/// reminder request, e.g. "Remind me to call Vaibhav" -> "call Vaibhav".
#[async_trait::async_trait]
pub trait ICruxExtractor: Send + Sync {
    async fn extract(&self, raw_task: &str) -> anyhow::Result<String>;
}
