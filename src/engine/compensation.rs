use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::TravelCostPolicy;
use crate::geo::{GeoDistanceProvider, RouteEstimate};
use crate::models::order::LineItem;
use crate::models::photographer::GeoPoint;

const LARGE_SHOOT_PHOTO_COUNT: u32 = 20;
const LARGE_SHOOT_SURCHARGE: f64 = 30.0;
const UNIT_PRICE_FALLBACK_RATIO: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Budget,
    Standard,
    Premium,
    Enterprise,
}

impl Tier {
    pub fn rate(self) -> f64 {
        match self {
            Tier::Budget => 80.0,
            Tier::Standard => 120.0,
            Tier::Premium => 180.0,
            Tier::Enterprise => 250.0,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "budget" => Some(Tier::Budget),
            "standard" => Some(Tier::Standard),
            "premium" => Some(Tier::Premium),
            "enterprise" => Some(Tier::Enterprise),
            _ => None,
        }
    }

    fn infer_from_package(package_id: &str) -> Option<Self> {
        let package_id = package_id.to_ascii_lowercase();
        if package_id.contains("basic") {
            Some(Tier::Budget)
        } else if package_id.contains("premium") || package_id.contains("pro") {
            Some(Tier::Premium)
        } else if package_id.contains("enterprise") {
            Some(Tier::Enterprise)
        } else {
            None
        }
    }
}

/// Package metadata embedded in a line item's free-form notes.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageNotes {
    Recognized {
        tier: Option<Tier>,
        package_id: Option<String>,
        photo_count: Option<u32>,
    },
    Unrecognized,
}

impl PackageNotes {
    /// Accepts a JSON object carrying any of `tier`, `package_id` or
    /// `photo_count` (camelCase keys too). Anything else is unrecognized.
    pub fn parse(notes: Option<&str>) -> Self {
        let Some(raw) = notes.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return PackageNotes::Unrecognized;
        };
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(raw) else {
            return PackageNotes::Unrecognized;
        };

        let tier_present = fields.contains_key("tier");
        let tier = fields
            .get("tier")
            .and_then(Value::as_str)
            .and_then(Tier::parse);
        let package_id = field(&fields, "package_id", "packageId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let photo_count = field(&fields, "photo_count", "photoCount").and_then(|value| match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        if !tier_present && package_id.is_none() && photo_count.is_none() {
            return PackageNotes::Unrecognized;
        }

        PackageNotes::Recognized {
            tier,
            package_id,
            photo_count,
        }
    }
}

fn field<'a>(fields: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    fields.get(snake).or_else(|| fields.get(camel))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TravelSuggestion {
    pub distance_km: f64,
    pub duration_min: f64,
    pub travel_cost: f64,
}

/// One side of a trip: a known coordinate or an address still to geocode.
#[derive(Debug, Clone, Copy)]
pub struct TripEndpoint<'a> {
    pub coordinate: Option<GeoPoint>,
    pub address: Option<&'a str>,
}

pub struct CompensationCalculator {
    geo: Arc<dyn GeoDistanceProvider>,
    travel: TravelCostPolicy,
}

impl CompensationCalculator {
    pub fn new(geo: Arc<dyn GeoDistanceProvider>, travel: TravelCostPolicy) -> Self {
        Self { geo, travel }
    }

    pub fn suggest_payment(&self, items: &[LineItem]) -> i64 {
        suggest_payment(items)
    }

    pub fn suggest_travel_cost(&self, distance_km: f64) -> f64 {
        travel_cost(&self.travel, distance_km)
    }

    /// Resolves missing coordinates and prices the trip. Returns `None` when
    /// either side cannot be located or routed.
    pub async fn suggest_travel(
        &self,
        home: TripEndpoint<'_>,
        shoot: TripEndpoint<'_>,
    ) -> Option<TravelSuggestion> {
        let from = self.resolve(home, "photographer home").await?;
        let to = self.resolve(shoot, "shoot address").await?;

        let RouteEstimate {
            distance_km,
            duration_min,
        } = match self.geo.route(from, to).await {
            Ok(estimate) => estimate,
            Err(err) => {
                warn!(error = %err, "route lookup failed; travel cost unavailable");
                return None;
            }
        };

        Some(TravelSuggestion {
            distance_km,
            duration_min,
            travel_cost: self.suggest_travel_cost(distance_km),
        })
    }

    async fn resolve(&self, endpoint: TripEndpoint<'_>, label: &str) -> Option<GeoPoint> {
        if let Some(point) = endpoint.coordinate {
            return Some(point);
        }
        let address = endpoint.address?;

        match self.geo.geocode(address).await {
            Ok(point) => Some(point),
            Err(err) => {
                warn!(endpoint = label, error = %err, "geocoding failed; travel cost unavailable");
                None
            }
        }
    }
}

pub fn item_payment(item: &LineItem) -> f64 {
    match PackageNotes::parse(item.notes.as_deref()) {
        PackageNotes::Recognized {
            tier,
            package_id,
            photo_count,
        } => {
            let tier = tier
                .or_else(|| package_id.as_deref().and_then(Tier::infer_from_package))
                .unwrap_or(Tier::Standard);
            let surcharge = match photo_count {
                Some(count) if count > LARGE_SHOOT_PHOTO_COUNT => LARGE_SHOOT_SURCHARGE,
                _ => 0.0,
            };
            tier.rate() + surcharge
        }
        PackageNotes::Unrecognized => (item.unit_price * UNIT_PRICE_FALLBACK_RATIO).round(),
    }
}

pub fn suggest_payment(items: &[LineItem]) -> i64 {
    items.iter().map(item_payment).sum::<f64>().round() as i64
}

/// Distance above the free allowance, billed per kilometer. Round trips bill
/// both legs. Result is rounded to cents.
pub fn travel_cost(policy: &TravelCostPolicy, distance_km: f64) -> f64 {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return 0.0;
    }

    let billed_km = if policy.round_trip {
        distance_km * 2.0
    } else {
        distance_km
    };
    let chargeable = (billed_km - policy.free_km).max(0.0);

    (chargeable * policy.rate_per_km * 100.0).round() / 100.0
}
