//! Operator alerting.

pub mod smtp;

use async_trait::async_trait;
use tracing::debug;

pub use smtp::SmtpAlerts;

/// Notification seam. Delivery is best effort everywhere: a harvest run
/// must never die because the mail relay is sulking, so implementations
/// swallow their own failures after logging them.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Sink used when alerting is switched off.
pub struct NoopAlerts;

#[async_trait]
impl AlertSink for NoopAlerts {
    async fn notify(&self, subject: &str, _body: &str) {
        debug!(subject, "alerting disabled, dropping notification");
    }
}
