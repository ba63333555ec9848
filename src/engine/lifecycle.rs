use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DeadlinePolicy;
use crate::engine::deadline::{compute_deadline, scheduled_start};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::assignment::{
    Assignment, AssignmentEvent, AssignmentPatch, AssignmentStatus, CompensationBreakdown,
    Decision, Transition,
};
use crate::notify::{
    Notification, NotificationDispatcher, NotificationKind, OutboundWebhook, WebhookEvent,
};
use crate::observability::metrics::Metrics;
use crate::store::{AssignmentStore, OrderStore, ProfileStore};

pub const EXPIRED_REASON: &str = "no response before deadline";

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub order_id: Uuid,
    pub photographer_id: Uuid,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
    pub payment_amount: f64,
    #[serde(default)]
    pub travel_cost: f64,
}

/// Owns the assignment state machine:
/// `pending -> accepted -> completed` and `pending -> declined`.
///
/// Every status change is a compare-and-swap against the status the caller
/// expects, so a photographer response and the expiry sweep racing on the
/// same row resolve to exactly one winner.
pub struct AssignmentLifecycleManager {
    assignments: Arc<dyn AssignmentStore>,
    orders: Arc<dyn OrderStore>,
    profiles: Arc<dyn ProfileStore>,
    notifier: NotificationDispatcher,
    webhook: Option<Arc<dyn OutboundWebhook>>,
    deadline: DeadlinePolicy,
    events_tx: broadcast::Sender<AssignmentEvent>,
    metrics: Metrics,
}

impl AssignmentLifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        orders: Arc<dyn OrderStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: NotificationDispatcher,
        webhook: Option<Arc<dyn OutboundWebhook>>,
        deadline: DeadlinePolicy,
        events_tx: broadcast::Sender<AssignmentEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            assignments,
            orders,
            profiles,
            notifier,
            webhook,
            deadline,
            events_tx,
            metrics,
        }
    }

    pub async fn create(&self, actor: &Actor, request: NewAssignment) -> Result<Assignment, AppError> {
        require_admin(actor, "create assignments")?;
        validate_amount("payment_amount", request.payment_amount)?;
        validate_amount("travel_cost", request.travel_cost)?;
        if request.scheduled_time.is_some() && request.scheduled_date.is_none() {
            return Err(AppError::Validation(
                "scheduled_time requires scheduled_date".to_string(),
            ));
        }

        self.orders
            .find(request.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", request.order_id)))?;
        self.profiles.find(request.photographer_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("photographer {} not found", request.photographer_id))
        })?;

        if let Some(active) = self.assignments.find_active_for_order(request.order_id).await? {
            return Err(AppError::Conflict(format!(
                "order {} already has {} assignment {}",
                request.order_id,
                active.status.as_str(),
                active.id
            )));
        }

        let assigned_at = Utc::now();
        let shoot_start = request
            .scheduled_date
            .map(|date| scheduled_start(date, request.scheduled_time));
        let deadline = compute_deadline(&self.deadline, assigned_at, shoot_start).ok_or_else(|| {
            AppError::Validation("scheduled shoot must be in the future".to_string())
        })?;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            order_id: request.order_id,
            photographer_id: request.photographer_id,
            assigner_id: actor.user_id,
            status: AssignmentStatus::Pending,
            admin_notes: request.admin_notes.filter(|notes| !notes.trim().is_empty()),
            photographer_notes: None,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            compensation: CompensationBreakdown::new(request.payment_amount, request.travel_cost),
            assigned_at,
            responded_at: None,
            deadline,
        };

        self.assignments.insert(assignment.clone()).await?;

        info!(
            assignment_id = %assignment.id,
            order_id = %assignment.order_id,
            photographer_id = %assignment.photographer_id,
            deadline = %assignment.deadline,
            "assignment offered"
        );

        let shoot_day = assignment
            .scheduled_date
            .map(|date| format!(" on {date}"))
            .unwrap_or_default();
        self.notifier
            .dispatch(Notification::new(
                assignment.photographer_id,
                NotificationKind::AssignmentOffered,
                "New shoot offer",
                format!(
                    "You have been offered a shoot{shoot_day}. Please respond before {}.",
                    assignment.deadline.format("%Y-%m-%d %H:%M UTC")
                ),
                link(&assignment),
            ))
            .await;
        self.fire_webhook(&assignment);
        self.publish(Transition::Created, assignment.clone());

        Ok(assignment)
    }

    pub async fn respond(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<Assignment, AppError> {
        self.respond_at(actor, assignment_id, decision, reason, Utc::now())
            .await
    }

    pub async fn respond_at(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
        decision: Decision,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Assignment, AppError> {
        let mut assignment = self.load(assignment_id).await?;

        if actor.role != Role::Photographer || actor.user_id != assignment.photographer_id {
            return Err(AppError::UnauthorizedTransition(
                "only the assigned photographer can respond to this offer".to_string(),
            ));
        }

        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        if decision == Decision::Decline && reason.is_none() {
            return Err(AppError::Validation(
                "a reason is required when declining".to_string(),
            ));
        }

        if assignment.status != AssignmentStatus::Pending || now >= assignment.deadline {
            return Err(self.stale(assignment_id, "respond"));
        }

        let (status, transition) = match decision {
            Decision::Accept => (AssignmentStatus::Accepted, Transition::Accepted),
            Decision::Decline => (AssignmentStatus::Declined, Transition::Declined),
        };
        let patch = AssignmentPatch {
            status: Some(status),
            photographer_notes: reason.clone(),
            responded_at: Some(now),
            ..AssignmentPatch::default()
        };

        let affected = self
            .assignments
            .conditional_update(assignment_id, AssignmentStatus::Pending, patch.clone())
            .await?;
        if affected == 0 {
            return Err(self.stale(assignment_id, "respond"));
        }
        patch.apply(&mut assignment);

        info!(
            assignment_id = %assignment_id,
            order_id = %assignment.order_id,
            status = status.as_str(),
            "photographer responded"
        );

        let notification = match decision {
            Decision::Accept => Notification::new(
                assignment.assigner_id,
                NotificationKind::AssignmentAccepted,
                "Assignment accepted",
                format!(
                    "The photographer accepted the shoot for order {}.",
                    assignment.order_id
                ),
                link(&assignment),
            ),
            Decision::Decline => Notification::new(
                assignment.assigner_id,
                NotificationKind::AssignmentDeclined,
                "Assignment declined",
                format!(
                    "The photographer declined the shoot for order {}. Reason: {}",
                    assignment.order_id,
                    reason.as_deref().unwrap_or_default()
                ),
                link(&assignment),
            ),
        };
        self.notifier.dispatch(notification).await;
        self.publish(transition, assignment.clone());

        Ok(assignment)
    }

    pub async fn mark_completed(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
    ) -> Result<Assignment, AppError> {
        require_admin(actor, "mark assignments completed")?;
        let mut assignment = self.load(assignment_id).await?;

        if assignment.status != AssignmentStatus::Accepted {
            return Err(self.stale(assignment_id, "complete"));
        }

        let patch = AssignmentPatch {
            status: Some(AssignmentStatus::Completed),
            ..AssignmentPatch::default()
        };
        let affected = self
            .assignments
            .conditional_update(assignment_id, AssignmentStatus::Accepted, patch.clone())
            .await?;
        if affected == 0 {
            return Err(self.stale(assignment_id, "complete"));
        }
        patch.apply(&mut assignment);

        info!(assignment_id = %assignment_id, order_id = %assignment.order_id, "assignment completed");

        self.notifier
            .dispatch(Notification::new(
                assignment.photographer_id,
                NotificationKind::AssignmentCompleted,
                "Shoot completed",
                format!("The shoot for order {} was marked completed.", assignment.order_id),
                link(&assignment),
            ))
            .await;
        self.publish(Transition::Completed, assignment.clone());

        Ok(assignment)
    }

    /// Overwrites the stored compensation. Allowed while the assignment is
    /// still pending or accepted.
    pub async fn update_compensation(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
        payment_amount: f64,
        travel_cost: f64,
    ) -> Result<Assignment, AppError> {
        require_admin(actor, "edit compensation")?;
        validate_amount("payment_amount", payment_amount)?;
        validate_amount("travel_cost", travel_cost)?;

        let mut assignment = self.load(assignment_id).await?;
        if !assignment.status.is_active() {
            return Err(self.stale(assignment_id, "update compensation"));
        }

        let patch = AssignmentPatch {
            compensation: Some(CompensationBreakdown::new(payment_amount, travel_cost)),
            ..AssignmentPatch::default()
        };
        let affected = self
            .assignments
            .conditional_update(assignment_id, assignment.status, patch.clone())
            .await?;
        if affected == 0 {
            return Err(self.stale(assignment_id, "update compensation"));
        }
        patch.apply(&mut assignment);

        info!(
            assignment_id = %assignment_id,
            payment_amount,
            travel_cost,
            "assignment compensation updated"
        );
        self.publish(Transition::CompensationUpdated, assignment.clone());

        Ok(assignment)
    }

    /// Declines every pending offer whose deadline passed before `now`. Rows
    /// are handled one by one: a failure on one row does not undo others, and
    /// rows another actor already moved out of `pending` are skipped. Running
    /// it twice over the same data expires nothing the second time.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let start = Instant::now();
        let due = self.assignments.find_pending_past_deadline(now).await?;

        let mut expired = 0usize;
        let mut lost_races = 0usize;

        for mut assignment in due {
            let patch = AssignmentPatch {
                status: Some(AssignmentStatus::Declined),
                photographer_notes: Some(EXPIRED_REASON.to_string()),
                ..AssignmentPatch::default()
            };

            let affected = match self
                .assignments
                .conditional_update(assignment.id, AssignmentStatus::Pending, patch.clone())
                .await
            {
                Ok(affected) => affected,
                Err(err) => {
                    error!(assignment_id = %assignment.id, error = %err, "failed to expire assignment");
                    continue;
                }
            };
            if affected == 0 {
                lost_races += 1;
                continue;
            }
            patch.apply(&mut assignment);
            expired += 1;
            self.metrics.record_transition(Transition::Expired.as_str());

            if let Err(err) = self.orders.increment_unanswered(assignment.order_id).await {
                warn!(
                    order_id = %assignment.order_id,
                    error = %err,
                    "failed to bump unanswered-assignment counter"
                );
            }

            info!(
                assignment_id = %assignment.id,
                order_id = %assignment.order_id,
                deadline = %assignment.deadline,
                "assignment expired"
            );

            self.notifier
                .dispatch(Notification::new(
                    assignment.assigner_id,
                    NotificationKind::AssignmentExpired,
                    "Assignment expired",
                    format!(
                        "The photographer did not respond before the deadline for order {}.",
                        assignment.order_id
                    ),
                    link(&assignment),
                ))
                .await;
            let _ = self.events_tx.send(AssignmentEvent {
                transition: Transition::Expired,
                assignment,
            });
        }

        let elapsed = start.elapsed();
        self.metrics.sweep_runs_total.inc();
        self.metrics
            .sweep_duration_seconds
            .observe(elapsed.as_secs_f64());
        info!(expired, lost_races, elapsed_ms = elapsed.as_millis() as u64, "expiry sweep finished");

        Ok(expired)
    }

    pub async fn get(&self, assignment_id: Uuid) -> Result<Assignment, AppError> {
        self.load(assignment_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Assignment>, AppError> {
        Ok(self.assignments.list_all().await?)
    }

    pub async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        Ok(self.assignments.list_for_order(order_id).await?)
    }

    pub async fn list_for_photographer(
        &self,
        photographer_id: Uuid,
    ) -> Result<Vec<Assignment>, AppError> {
        Ok(self.assignments.list_for_photographer(photographer_id).await?)
    }

    async fn load(&self, assignment_id: Uuid) -> Result<Assignment, AppError> {
        self.assignments
            .find_by_id(assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id} not found")))
    }

    fn stale(&self, assignment_id: Uuid, action: &str) -> AppError {
        warn!(assignment_id = %assignment_id, action, "assignment no longer in expected state");
        self.metrics.record_transition("stale");
        AppError::StaleAssignment
    }

    fn publish(&self, transition: Transition, assignment: Assignment) {
        self.metrics.record_transition(transition.as_str());
        let _ = self.events_tx.send(AssignmentEvent {
            transition,
            assignment,
        });
    }

    fn fire_webhook(&self, assignment: &Assignment) {
        let Some(webhook) = self.webhook.clone() else {
            return;
        };
        let event = WebhookEvent::assignment_created(assignment);

        tokio::spawn(async move {
            if let Err(err) = webhook.send(&event).await {
                warn!(
                    assignment_id = %event.assignment_id,
                    error = %err,
                    "assignment webhook failed"
                );
            }
        });
    }
}

fn require_admin(actor: &Actor, action: &str) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::UnauthorizedTransition(format!(
            "only admins can {action}"
        )))
    }
}

fn validate_amount(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        )))
    }
}

fn link(assignment: &Assignment) -> String {
    format!("/assignments/{}", assignment.id)
}
