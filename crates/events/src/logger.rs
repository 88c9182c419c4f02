//! Notification logging service.
//!
//! [`NotificationLogger`] writes [`SubscriptionEvent`]s to the `notifications`
//! table. It runs as a long-lived consumer of the [`EventBus`](crate::EventBus)
//! and is also called directly for administrative notices. Every write carries
//! its own timeout; failures are logged and never reach the publisher.
//!
//! Dedup-then-insert is not atomic at the database level. Bus traffic is
//! handled by a single consumer task, so concurrent threshold crossings from
//! parallel requests are serialised here and produce one record per window.

use std::time::Duration;

use parley_db::models::notification::Notification;
use parley_db::repositories::NotificationRepo;
use parley_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::SubscriptionEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Default timeout for a single dedup-and-insert.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of handling one event.
#[derive(Debug)]
pub enum LogOutcome {
    Recorded(Notification),
    /// A notice of the same kind is already inside the dedup window.
    Suppressed,
}

/// Error type for a failed log attempt.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Notification write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Notification write failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Writes subscription notices to the notification log.
#[derive(Clone)]
pub struct NotificationLogger {
    pool: DbPool,
    write_timeout: Duration,
    webhook: Option<WebhookDelivery>,
}

impl NotificationLogger {
    pub fn new(pool: DbPool, write_timeout: Duration) -> Self {
        Self {
            pool,
            write_timeout,
            webhook: None,
        }
    }

    /// Forward every recorded notice to a webhook as well.
    pub fn with_webhook(mut self, webhook: WebhookDelivery) -> Self {
        self.webhook = Some(webhook);
        self
    }

    /// Run the consumer loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<SubscriptionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    // Errors are already logged inside `handle`.
                    let _ = self.handle(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Notification logger lagged, some notices were not logged"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification logger shutting down");
                    break;
                }
            }
        }
    }

    /// Dedup-check, insert and forward one event, bounded by the write timeout.
    ///
    /// Failures are logged here; callers may ignore the result.
    pub async fn handle(&self, event: &SubscriptionEvent) -> Result<LogOutcome, LogError> {
        let outcome = match tokio::time::timeout(self.write_timeout, self.write(event)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    project_id = event.project_id,
                    kind = %event.kind,
                    "Failed to log notification"
                );
                return Err(LogError::Database(e));
            }
            Err(_) => {
                tracing::error!(
                    project_id = event.project_id,
                    kind = %event.kind,
                    timeout = ?self.write_timeout,
                    "Notification write timed out"
                );
                return Err(LogError::Timeout(self.write_timeout));
            }
        };

        match &outcome {
            LogOutcome::Recorded(notification) => {
                tracing::info!(
                    project_id = event.project_id,
                    notification_id = notification.id,
                    kind = %event.kind,
                    "Notification logged"
                );
                if let Some(webhook) = &self.webhook {
                    let webhook = webhook.clone();
                    let event = event.clone();
                    tokio::spawn(async move {
                        let _ = webhook.deliver(&event).await;
                    });
                }
            }
            LogOutcome::Suppressed => {
                tracing::debug!(
                    project_id = event.project_id,
                    kind = %event.kind,
                    "Notification suppressed by dedup window"
                );
            }
        }

        Ok(outcome)
    }

    async fn write(&self, event: &SubscriptionEvent) -> Result<LogOutcome, sqlx::Error> {
        let kind = event.kind.as_str();

        if let Some(hours) = event.dedup_hours {
            if NotificationRepo::was_recently_sent(&self.pool, event.project_id, kind, hours).await?
            {
                return Ok(LogOutcome::Suppressed);
            }
        }

        let notification =
            NotificationRepo::record(&self.pool, event.project_id, kind, &event.message).await?;
        Ok(LogOutcome::Recorded(notification))
    }
}
