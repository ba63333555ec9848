use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use super::NotifyError;
use crate::models::assignment::Assignment;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    pub event: &'static str,
    pub assignment_id: Uuid,
    pub order_id: Uuid,
    pub photographer_id: Uuid,
    pub payment_amount: f64,
    pub travel_cost: f64,
    pub scheduled_date: Option<NaiveDate>,
}

impl WebhookEvent {
    pub fn assignment_created(assignment: &Assignment) -> Self {
        Self {
            event: "assignment.created",
            assignment_id: assignment.id,
            order_id: assignment.order_id,
            photographer_id: assignment.photographer_id,
            payment_amount: assignment.compensation.payment_amount,
            travel_cost: assignment.compensation.travel_cost,
            scheduled_date: assignment.scheduled_date,
        }
    }
}

/// Best-effort outbound integration hook.
#[async_trait]
pub trait OutboundWebhook: Send + Sync {
    async fn send(&self, event: &WebhookEvent) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct HttpWebhook {
    client: Client,
    target_url: String,
}

impl HttpWebhook {
    pub fn new(target_url: String, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        Ok(Self { client, target_url })
    }
}

#[async_trait]
impl OutboundWebhook for HttpWebhook {
    async fn send(&self, event: &WebhookEvent) -> Result<(), NotifyError> {
        self.client
            .post(&self.target_url)
            .json(event)
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(())
    }
}
