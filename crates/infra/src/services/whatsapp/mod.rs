use super::INotifier;
use crate::config::Config;

use reqwest::Client;
use serde::Serialize;
use tracing::error;

// https://developers.facebook.com/docs/whatsapp/cloud-api/reference/messages
const API_BASE_URL: &str = "https://graph.facebook.com/v19.0";

#[derive(Debug, Serialize)]
struct TextMessageBody<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    body: &'a str,
}

/// WhatsApp Cloud API client that delivers reminder notifications as
/// plain text messages.
pub struct WhatsAppNotifier {
    client: Client,
    api_token: String,
    phone_number_id: String,
}

impl WhatsAppNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_token: config.whatsapp_api_token.clone(),
            phone_number_id: config.whatsapp_phone_number_id.clone(),
        }
    }
}

#[async_trait::async_trait]
impl INotifier for WhatsAppNotifier {
    async fn send(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        let body = TextMessageBody {
            messaging_product: "whatsapp",
            to: user_id,
            message_type: "text",
            text: TextContent { body: text },
        };

        let res = self
            .client
            .post(format!(
                "{}/{}/messages",
                API_BASE_URL, self.phone_number_id
            ))
            .bearer_auth(&self.api_token)
            .json(&body)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let response_body = res.text().await.unwrap_or_default();
            error!(
                "WhatsApp message to {} failed with status {}: {}",
                user_id, status, response_body
            );
            anyhow::bail!("WhatsApp API responded with status {}", status);
        }
        Ok(())
    }
}
