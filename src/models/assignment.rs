use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl AssignmentStatus {
    /// Pending and accepted assignments occupy the order's single active slot.
    pub fn is_active(self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::Accepted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Accepted => "accepted",
            AssignmentStatus::Declined => "declined",
            AssignmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompensationBreakdown {
    pub payment_amount: f64,
    pub travel_cost: f64,
    pub total: f64,
}

impl CompensationBreakdown {
    pub fn new(payment_amount: f64, travel_cost: f64) -> Self {
        Self {
            payment_amount,
            travel_cost,
            total: payment_amount + travel_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub photographer_id: Uuid,
    pub assigner_id: Uuid,
    pub status: AssignmentStatus,
    pub admin_notes: Option<String>,
    pub photographer_notes: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub compensation: CompensationBreakdown,
    pub assigned_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
}

/// Field changes applied together with a status compare-and-swap.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
    pub status: Option<AssignmentStatus>,
    pub photographer_notes: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub compensation: Option<CompensationBreakdown>,
}

impl AssignmentPatch {
    pub fn apply(&self, assignment: &mut Assignment) {
        if let Some(status) = self.status {
            assignment.status = status;
        }
        if let Some(notes) = &self.photographer_notes {
            assignment.photographer_notes = Some(notes.clone());
        }
        if let Some(responded_at) = self.responded_at {
            assignment.responded_at = Some(responded_at);
        }
        if let Some(compensation) = self.compensation {
            assignment.compensation = compensation;
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Created,
    Accepted,
    Declined,
    Expired,
    Completed,
    CompensationUpdated,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Created => "created",
            Transition::Accepted => "accepted",
            Transition::Declined => "declined",
            Transition::Expired => "expired",
            Transition::Completed => "completed",
            Transition::CompensationUpdated => "compensation_updated",
        }
    }
}

/// Broadcast to live dashboards after every applied change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub transition: Transition,
    pub assignment: Assignment,
}
