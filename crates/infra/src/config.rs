use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    /// IANA timezone used to interpret natural-language times and to
    /// format user-facing confirmations.
    pub timezone: Tz,
    /// Bearer token for the WhatsApp Cloud API.
    pub whatsapp_api_token: String,
    /// Sender phone number id for the WhatsApp Cloud API.
    pub whatsapp_phone_number_id: String,
    /// API key for the Gemini generateContent endpoint used to extract
    /// the task crux from a raw reminder request.
    pub gemini_api_key: String,
}

impl Config {
    pub fn new() -> Self {
        let default_timezone = Tz::UTC;
        let timezone = match std::env::var("DEFAULT_REMINDER_TIMEZONE") {
            Ok(name) => match name.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(
                        "The given DEFAULT_REMINDER_TIMEZONE: {} is not a valid IANA timezone, falling back to {}.",
                        name, default_timezone
                    );
                    default_timezone
                }
            },
            Err(_) => default_timezone,
        };

        Self {
            timezone,
            whatsapp_api_token: env_or_warn("WHATSAPP_API_TOKEN"),
            whatsapp_phone_number_id: env_or_warn("WHATSAPP_PHONE_NUMBER_ID"),
            gemini_api_key: env_or_warn("GEMINI_API_KEY"),
        }
    }
}

fn env_or_warn(key: &str) -> String {
    match std::env::var(key) {
        Ok(value) => value,
        Err(_) => {
            warn!(
                "Did not find {} environment variable. The related service calls will fail.",
                key
            );
            String::new()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
