use async_trait::async_trait;
use tracing::info;

use crate::structs::NotificationRequest;

/// The platform's pending-notification queue. Implementations must not block:
/// publishing is fire-and-forget.
pub trait NotificationSink: Send + Sync {
    /// Drops every pending request.
    fn clear_pending(&self);

    /// Adds a request, replacing any pending request with the same identifier.
    fn add_request(&self, request: NotificationRequest);
}

/// Asks the platform whether notifications may be shown.
#[async_trait]
pub trait NotificationAuthorizer: Send + Sync {
    async fn request_authorization(&self) -> bool;
}

/// Writes the schedule to the log instead of a platform queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn clear_pending(&self) {
        info!("Cleared pending reminders");
    }

    fn add_request(&self, request: NotificationRequest) {
        info!(
            id = %request.identifier,
            "Reminder at {:02}:{:02} daily: {} - {}",
            request.hour,
            request.minute,
            request.title,
            request.body
        );
    }
}

/// Grants or denies without asking anyone.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthorizer(pub bool);

#[async_trait]
impl NotificationAuthorizer for StaticAuthorizer {
    async fn request_authorization(&self) -> bool {
        self.0
    }
}
