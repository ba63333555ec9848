use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(AppError::Validation(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default)]
    pub note: Option<String>,
}

/// Freelance photographer as seen by the matcher. A profile without `home`
/// cannot be located and never shows up as a ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotographerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub city: Option<String>,
    pub home: Option<GeoPoint>,
    pub home_address: Option<String>,
    pub service_radius_km: f64,
    pub calendar: Vec<CalendarEntry>,
    pub updated_at: DateTime<Utc>,
}

impl PhotographerProfile {
    pub fn availability_on(&self, date: NaiveDate) -> Option<&CalendarEntry> {
        self.calendar.iter().find(|entry| entry.date == date)
    }
}
