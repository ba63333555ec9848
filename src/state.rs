use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::compensation::CompensationCalculator;
use crate::engine::lifecycle::AssignmentLifecycleManager;
use crate::engine::matching::AvailabilityMatcher;
use crate::error::AppError;
use crate::geo::{GeoDistanceProvider, HttpGeoProvider};
use crate::models::assignment::AssignmentEvent;
use crate::notify::{HttpWebhook, InboxNotificationSink, NotificationDispatcher, OutboundWebhook};
use crate::observability::metrics::Metrics;
use crate::store::{InMemoryAssignmentStore, InMemoryOrderStore, InMemoryProfileStore};

pub struct AppState {
    pub config: Config,
    pub profiles: Arc<InMemoryProfileStore>,
    pub orders: Arc<InMemoryOrderStore>,
    pub assignments: Arc<InMemoryAssignmentStore>,
    pub inbox: Arc<InboxNotificationSink>,
    pub matcher: AvailabilityMatcher,
    pub compensation: CompensationCalculator,
    pub lifecycle: Arc<AssignmentLifecycleManager>,
    pub assignment_events_tx: broadcast::Sender<AssignmentEvent>,
    pub metrics: Metrics,
}

impl AppState {
    /// Wires the HTTP geo provider and webhook from configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let geo = HttpGeoProvider::new(
            config.geocoder_url.clone(),
            config.routing_url.clone(),
            config.geo_timeout_secs,
        )
        .map_err(|err| AppError::Internal(format!("geo provider: {err}")))?;

        let webhook = match config.webhook_url.clone() {
            Some(url) => {
                let webhook = HttpWebhook::new(url, config.geo_timeout_secs)
                    .map_err(|err| AppError::Internal(format!("webhook: {err}")))?;
                Some(Arc::new(webhook) as Arc<dyn OutboundWebhook>)
            }
            None => None,
        };

        Ok(Self::new(config, Arc::new(geo), webhook))
    }

    pub fn new(
        config: Config,
        geo: Arc<dyn GeoDistanceProvider>,
        webhook: Option<Arc<dyn OutboundWebhook>>,
    ) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));
        let metrics = Metrics::new();

        let profiles = Arc::new(InMemoryProfileStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let assignments = Arc::new(InMemoryAssignmentStore::new());
        let inbox = Arc::new(InboxNotificationSink::new());

        let matcher = AvailabilityMatcher::new(
            profiles.clone(),
            orders.clone(),
            geo.clone(),
            config.default_max_distance_km,
            metrics.clone(),
        );
        let compensation = CompensationCalculator::new(geo, config.travel);
        let notifier = NotificationDispatcher::new(inbox.clone(), config.notify, metrics.clone());
        let lifecycle = Arc::new(AssignmentLifecycleManager::new(
            assignments.clone(),
            orders.clone(),
            profiles.clone(),
            notifier,
            webhook,
            config.deadline,
            assignment_events_tx.clone(),
            metrics.clone(),
        ));

        Self {
            config,
            profiles,
            orders,
            assignments,
            inbox,
            matcher,
            compensation,
            lifecycle,
            assignment_events_tx,
            metrics,
        }
    }
}
