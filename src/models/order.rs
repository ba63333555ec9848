use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::photographer::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShootAddress {
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub coordinate: Option<GeoPoint>,
    #[serde(default)]
    pub geocoded_at: Option<DateTime<Utc>>,
}

impl ShootAddress {
    /// Single-line form handed to the geocoder.
    pub fn one_line(&self) -> String {
        let street = format!("{} {}", self.street.trim(), self.number.trim());
        let locality = format!("{} {}", self.postal_code.trim(), self.city.trim());

        [street.trim(), locality.trim(), self.country.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub total_amount: f64,
    pub items: Vec<LineItem>,
    pub shoot_address: Option<ShootAddress>,
    /// Offers on this order that expired without a photographer response.
    pub unanswered_assignments: u32,
    pub created_at: DateTime<Utc>,
}
