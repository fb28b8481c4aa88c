//! Environment-driven application configuration.

use std::env;
use std::path::PathBuf;

use crate::domain::email_service::EmailConfig;

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base directory for the CSV store and report artifacts.
    pub data_dir: PathBuf,
    /// Exchange-rate API base URL, without the trailing base currency.
    pub exchange_rate_url: String,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let username = env_or("EMAIL_USER", "");
        let email = EmailConfig {
            smtp_server: env_or("SMTP_SERVER", "smtp.gmail.com"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            password: env_or("EMAIL_PASS", ""),
            from_email: username.clone(),
            username,
        };

        Self {
            data_dir: PathBuf::from(env_or("FINANCE_DATA_DIR", "data")),
            exchange_rate_url: env_or("EXCHANGE_RATE_URL", DEFAULT_EXCHANGE_RATE_URL),
            email,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
