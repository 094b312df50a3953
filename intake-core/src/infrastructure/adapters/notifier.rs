// intake-core/src/infrastructure/adapters/notifier.rs

use async_trait::async_trait;
use tracing::info;

use crate::error::IntakeError;
use crate::ports::{Notification, Notifier};

/// Emits notifications as structured log events instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), IntakeError> {
        let data = serde_json::to_string(&notification.data)
            .map_err(crate::infrastructure::error::InfrastructureError::from)?;
        info!(
            kind = %notification.kind,
            subject = %notification.subject,
            recipients = ?notification.recipients,
            data = %data,
            "{}",
            notification.message
        );
        Ok(())
    }
}
