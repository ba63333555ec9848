pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::NotifyPolicy;
use crate::observability::metrics::Metrics;

pub use webhook::{HttpWebhook, OutboundWebhook, WebhookEvent};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AssignmentOffered,
    AssignmentAccepted,
    AssignmentDeclined,
    AssignmentExpired,
    AssignmentCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link: link.into(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Keeps every user's notifications in memory; served by `GET /notifications`.
#[derive(Default)]
pub struct InboxNotificationSink {
    inboxes: DashMap<Uuid, Vec<Notification>>,
}

impl InboxNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inbox(&self, user_id: Uuid) -> Vec<Notification> {
        let mut items = self
            .inboxes
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        items.reverse();
        items
    }
}

#[async_trait]
impl NotificationSink for InboxNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.inboxes
            .entry(notification.user_id)
            .or_default()
            .push(notification);
        Ok(())
    }
}

/// Delivers through a sink with bounded retries. Never reports failure to the
/// caller: a state transition that already committed stays committed.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    policy: NotifyPolicy,
    metrics: Metrics,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, policy: NotifyPolicy, metrics: Metrics) -> Self {
        Self {
            sink,
            policy,
            metrics,
        }
    }

    /// Returns whether the notification was eventually delivered.
    pub async fn dispatch(&self, notification: Notification) -> bool {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.sink.notify(notification.clone()).await {
                Ok(()) => return true,
                Err(err) => {
                    warn!(
                        user_id = %notification.user_id,
                        kind = ?notification.kind,
                        attempt,
                        error = %err,
                        "notification delivery failed"
                    );
                    if attempt < attempts {
                        let backoff = self.policy.backoff_ms.saturating_mul(1 << (attempt - 1).min(10));
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        self.metrics.notification_failures_total.inc();
        error!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "notification dropped after retries"
        );
        false
    }
}
