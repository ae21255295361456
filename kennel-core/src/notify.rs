use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    BookingConfirmed,
    BookingRejected,
    BookingCancelled,
}

#[derive(Debug, thiserror::Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Transactional email collaborator. Fire and forget: a failure is logged
/// by the caller and never rolls back a booking transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        template: TemplateKind,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Default wiring: logs what would have been sent.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        template: TemplateKind,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(?template, recipient, %data, "notification dispatched");
        Ok(())
    }
}
