//! Alert delivery for circuit isolation and recovery.
//!
//! Callers are the health monitor and the recovery prober. Delivery must
//! never block or fail them: `notify` returns immediately, webhook posts run
//! on their own task, and failures are logged without retry.

use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use crate::config::NotifierConfig;
use crate::load_balancer::BackendEndpoint;

/// Receives isolation and recovery alerts.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Fire-and-forget delivery.
    fn notify(&self, subject: &str, body: &str);
}

/// Alert raised when a backend's circuit opens.
pub fn isolation_alert(endpoint: &BackendEndpoint) -> (String, String) {
    (
        format!("Alert: {} is down", endpoint),
        format!("The storage service at {} is down and the circuit breaker is open.", endpoint),
    )
}

/// Alert raised when a backend's circuit closes after recovery.
pub fn recovery_alert(endpoint: &BackendEndpoint) -> (String, String) {
    (
        format!("Info: {} has recovered", endpoint),
        format!("The storage service at {} has recovered and is running.", endpoint),
    )
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str) {
        tracing::warn!(subject = %subject, body = %body, "Alert");
    }
}

/// Drops every alert.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _subject: &str, _body: &str) {}
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

/// POSTs `{subject, body}` JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, subject: &str, body: &str) {
        let request = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { subject, body });
        let url = self.url.clone();
        let subject = subject.to_string();

        tokio::spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => tracing::info!(subject = %subject, "Alert delivered"),
                Err(e) => tracing::error!(url = %url, subject = %subject, error = %e, "Failed to deliver alert"),
            }
        });
    }
}

/// Build the notifier described by `config`.
pub fn from_config(config: &NotifierConfig) -> Arc<dyn Notifier> {
    if !config.enabled {
        return Arc::new(NoopNotifier);
    }

    match &config.webhook_url {
        Some(url) => match WebhookNotifier::new(url.clone(), Duration::from_millis(config.timeout_ms)) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build webhook notifier, alerts will be logged");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_text() {
        let e = BackendEndpoint::parse("http://storage_service_1:5000").unwrap();
        let (subject, body) = isolation_alert(&e);
        assert_eq!(subject, "Alert: http://storage_service_1:5000 is down");
        assert!(body.contains("circuit breaker is open"));

        let (subject, _) = recovery_alert(&e);
        assert_eq!(subject, "Info: http://storage_service_1:5000 has recovered");
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_block_caller() {
        // Nothing listens on port 9 locally; delivery fails on its own task.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/alerts", Duration::from_millis(200)).unwrap();
        let start = std::time::Instant::now();
        notifier.notify("subject", "body");
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_disabled_config_yields_noop() {
        let config = NotifierConfig { enabled: false, ..NotifierConfig::default() };
        let notifier = from_config(&config);
        assert_eq!(format!("{:?}", notifier), "NoopNotifier");
    }
}
