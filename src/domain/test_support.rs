//! Shared fakes for domain service tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::currency_service::RateProvider;
use crate::domain::email_service::Notifier;

/// A notification captured by `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

/// Notifier that records every send instead of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.subject).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachment: attachment.map(|p| p.to_path_buf()),
        });
        Ok(())
    }
}

/// Rate provider returning a fixed USD-base table, or a fixed failure.
pub struct FixedRateProvider {
    rates: Option<HashMap<String, f64>>,
}

impl FixedRateProvider {
    pub fn with_rates(rates: &[(&str, f64)]) -> Self {
        Self {
            rates: Some(
                rates
                    .iter()
                    .map(|(code, rate)| (code.to_string(), *rate))
                    .collect(),
            ),
        }
    }

    pub fn failing() -> Self {
        Self { rates: None }
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn get_rates(&self, _base: &str) -> Result<HashMap<String, f64>> {
        match &self.rates {
            Some(rates) => Ok(rates.clone()),
            None => Err(anyhow::anyhow!("rate source unreachable")),
        }
    }
}
