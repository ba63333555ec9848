use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{AssignmentStore, OrderStore, ProfileStore, StoreError};
use crate::models::assignment::{Assignment, AssignmentPatch, AssignmentStatus};
use crate::models::order::Order;
use crate::models::photographer::{CalendarEntry, GeoPoint, PhotographerProfile};

/// Assignment rows keyed by id, plus an index of the single active row per
/// order. A shard write lock is held for the whole check-and-set of a
/// conditional update, which gives row-level compare-and-swap.
#[derive(Default)]
pub struct InMemoryAssignmentStore {
    rows: DashMap<Uuid, Assignment>,
    active_by_order: DashMap<Uuid, Uuid>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn snapshot<F>(&self, keep: F) -> Vec<Assignment>
    where
        F: Fn(&Assignment) -> bool,
    {
        let mut rows: Vec<Assignment> = self
            .rows
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then(a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn insert(&self, assignment: Assignment) -> Result<(), StoreError> {
        if !assignment.status.is_active() {
            self.rows.insert(assignment.id, assignment);
            return Ok(());
        }

        match self.active_by_order.entry(assignment.order_id) {
            Entry::Occupied(existing) => Err(StoreError::Conflict(format!(
                "order {} already has active assignment {}",
                assignment.order_id,
                existing.get()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(assignment.id);
                self.rows.insert(assignment.id, assignment);
                Ok(())
            }
        }
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        expected: AssignmentStatus,
        patch: AssignmentPatch,
    ) -> Result<u64, StoreError> {
        let released_order = {
            let Some(mut row) = self.rows.get_mut(&id) else {
                return Ok(0);
            };
            if row.status != expected {
                return Ok(0);
            }

            patch.apply(&mut row);

            if row.status.is_active() {
                None
            } else {
                Some(row.order_id)
            }
        };

        if let Some(order_id) = released_order {
            self.active_by_order
                .remove_if(&order_id, |_, active_id| *active_id == id);
        }

        Ok(1)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Assignment>, StoreError> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn find_pending_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>, StoreError> {
        let mut due = self.snapshot(|row| row.status == AssignmentStatus::Pending && row.deadline < now);
        due.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn find_active_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<Assignment>, StoreError> {
        let active_id = self.active_by_order.get(&order_id).map(|entry| *entry.value());

        Ok(active_id
            .and_then(|id| self.rows.get(&id).map(|row| row.value().clone()))
            .filter(|row| row.status.is_active()))
    }

    async fn list_all(&self) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.snapshot(|_| true))
    }

    async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.snapshot(|row| row.order_id == order_id))
    }

    async fn list_for_photographer(
        &self,
        photographer_id: Uuid,
    ) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.snapshot(|row| row.photographer_id == photographer_id))
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<Uuid, PhotographerProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn insert(&self, profile: PhotographerProfile) -> Result<(), StoreError> {
        match self.profiles.entry(profile.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "photographer {} already exists",
                profile.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(profile);
                Ok(())
            }
        }
    }

    async fn upsert(&self, profile: PhotographerProfile) -> Result<(), StoreError> {
        self.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn find(&self, photographer_id: Uuid) -> Result<Option<PhotographerProfile>, StoreError> {
        Ok(self
            .profiles
            .get(&photographer_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_photographers_with_role(&self) -> Result<Vec<PhotographerProfile>, StoreError> {
        let mut profiles: Vec<PhotographerProfile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by_key(|profile| profile.id);
        Ok(profiles)
    }

    async fn find_home_coordinate(
        &self,
        photographer_id: Uuid,
    ) -> Result<Option<GeoPoint>, StoreError> {
        Ok(self
            .profiles
            .get(&photographer_id)
            .and_then(|entry| entry.value().home))
    }

    async fn find_availability(
        &self,
        photographer_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<CalendarEntry>, StoreError> {
        Ok(self
            .profiles
            .get(&photographer_id)
            .and_then(|entry| entry.value().availability_on(date).cloned()))
    }

    async fn set_home(
        &self,
        photographer_id: Uuid,
        home: Option<GeoPoint>,
        home_address: Option<String>,
    ) -> Result<PhotographerProfile, StoreError> {
        let mut profile = self.profiles.get_mut(&photographer_id).ok_or_else(|| {
            StoreError::NotFound(format!("photographer {photographer_id} not found"))
        })?;

        profile.home = home;
        profile.home_address = home_address;
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    async fn upsert_calendar(
        &self,
        photographer_id: Uuid,
        entries: Vec<CalendarEntry>,
    ) -> Result<PhotographerProfile, StoreError> {
        let mut profile = self.profiles.get_mut(&photographer_id).ok_or_else(|| {
            StoreError::NotFound(format!("photographer {photographer_id} not found"))
        })?;

        for entry in entries {
            match profile.calendar.iter_mut().find(|existing| existing.date == entry.date) {
                Some(existing) => *existing = entry,
                None => profile.calendar.push(entry),
            }
        }
        profile.calendar.sort_by_key(|entry| entry.date);
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order);
                Ok(())
            }
        }
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&order_id).map(|entry| entry.value().clone()))
    }

    async fn update_shoot_coordinate(
        &self,
        order_id: Uuid,
        coordinate: GeoPoint,
        geocoded_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id} not found")))?;

        let address = order.shoot_address.as_mut().ok_or_else(|| {
            StoreError::NotFound(format!("order {order_id} has no shoot address"))
        })?;
        address.coordinate = Some(coordinate);
        address.geocoded_at = Some(geocoded_at);

        Ok(order.clone())
    }

    async fn increment_unanswered(&self, order_id: Uuid) -> Result<u32, StoreError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id} not found")))?;

        order.unanswered_assignments = order.unanswered_assignments.saturating_add(1);
        Ok(order.unanswered_assignments)
    }
}
