use super::ICruxExtractor;
use crate::config::Config;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

// https://ai.google.dev/api/generate-content
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Gemini-backed crux extraction. Failures are surfaced to the caller,
/// which falls back to the raw task text; a flaky LLM must never block
/// reminder creation.
pub struct GeminiCruxExtractor {
    client: Client,
    api_key: String,
}

impl GeminiCruxExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.gemini_api_key.clone(),
        }
    }

    fn build_prompt(raw_task: &str) -> String {
        format!(
            r#"Extract the core task or item the user wants to be reminded about from the following text. Remove any leading phrases like "Remind me to", "Can you remind me to", "I need to be reminded about". Just provide the concise task itself.

Example:
Text: "Remind me to call Vaibhav at 5 pm"
Crux: "call Vaibhav"

Text: "I need to be reminded about buying groceries"
Crux: "buying groceries"

Text: "meeting with John"
Crux: "meeting with John"

Text: "{}"
Crux:"#,
            raw_task
        )
    }
}

#[async_trait::async_trait]
impl ICruxExtractor for GeminiCruxExtractor {
    async fn extract(&self, raw_task: &str) -> anyhow::Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::build_prompt(raw_task),
                }],
            }],
        };

        let res = self
            .client
            .post(format!(
                "{}/{}:generateContent?key={}",
                API_BASE_URL, MODEL, self.api_key
            ))
            .json(&body)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            error!("Gemini crux extraction failed with status {}", status);
            anyhow::bail!("Gemini API responded with status {}", status);
        }

        let res: GenerateContentResponse = res.json().await?;
        let text = res
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        // Gemini sometimes wraps the reply in code fences or quotes.
        let crux = text
            .trim()
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim_matches('"')
            .trim()
            .to_string();

        if crux.is_empty() {
            anyhow::bail!("Gemini returned an empty crux");
        }
        Ok(crux)
    }
}
