pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentPatch, AssignmentStatus};
use crate::models::order::Order;
use crate::models::photographer::{CalendarEntry, GeoPoint, PhotographerProfile};

pub use memory::{InMemoryAssignmentStore, InMemoryOrderStore, InMemoryProfileStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Fails with `Conflict` when the order already has an active assignment.
    async fn insert(&self, assignment: Assignment) -> Result<(), StoreError>;

    /// Applies `patch` only if the row is still in `expected`. Returns the
    /// number of affected rows (0 or 1).
    async fn conditional_update(
        &self,
        id: Uuid,
        expected: AssignmentStatus,
        patch: AssignmentPatch,
    ) -> Result<u64, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Assignment>, StoreError>;

    async fn find_pending_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>, StoreError>;

    async fn find_active_for_order(&self, order_id: Uuid)
        -> Result<Option<Assignment>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Assignment>, StoreError>;

    async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Assignment>, StoreError>;

    async fn list_for_photographer(
        &self,
        photographer_id: Uuid,
    ) -> Result<Vec<Assignment>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `Conflict` when the id is already taken.
    async fn insert(&self, profile: PhotographerProfile) -> Result<(), StoreError>;

    async fn upsert(&self, profile: PhotographerProfile) -> Result<(), StoreError>;

    async fn find(&self, photographer_id: Uuid) -> Result<Option<PhotographerProfile>, StoreError>;

    async fn find_photographers_with_role(&self) -> Result<Vec<PhotographerProfile>, StoreError>;

    async fn find_home_coordinate(&self, photographer_id: Uuid)
        -> Result<Option<GeoPoint>, StoreError>;

    async fn find_availability(
        &self,
        photographer_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<CalendarEntry>, StoreError>;

    async fn set_home(
        &self,
        photographer_id: Uuid,
        home: Option<GeoPoint>,
        home_address: Option<String>,
    ) -> Result<PhotographerProfile, StoreError>;

    async fn upsert_calendar(
        &self,
        photographer_id: Uuid,
        entries: Vec<CalendarEntry>,
    ) -> Result<PhotographerProfile, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn update_shoot_coordinate(
        &self,
        order_id: Uuid,
        coordinate: GeoPoint,
        geocoded_at: DateTime<Utc>,
    ) -> Result<Order, StoreError>;

    async fn increment_unanswered(&self, order_id: Uuid) -> Result<u32, StoreError>;
}
