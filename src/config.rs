use std::env;

use chrono::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub sweep_interval_secs: u64,
    pub default_max_distance_km: f64,
    pub deadline: DeadlinePolicy,
    pub travel: TravelCostPolicy,
    pub geocoder_url: Option<String>,
    pub routing_url: Option<String>,
    pub geo_timeout_secs: u64,
    pub webhook_url: Option<String>,
    pub notify: NotifyPolicy,
}

/// Upper bound for both deadline coefficients.
pub const MAX_DEADLINE_HOURS: i64 = 24 * 90;

/// Response-window coefficients for pending offers.
#[derive(Debug, Clone, Copy)]
pub struct DeadlinePolicy {
    pub response_window: Duration,
    pub margin_before_shoot: Duration,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            response_window: Duration::hours(24),
            margin_before_shoot: Duration::hours(12),
        }
    }
}

/// Distance-to-price rule for travel compensation.
#[derive(Debug, Clone, Copy)]
pub struct TravelCostPolicy {
    pub free_km: f64,
    pub rate_per_km: f64,
    pub round_trip: bool,
}

impl Default for TravelCostPolicy {
    fn default() -> Self {
        Self {
            free_km: 20.0,
            rate_per_km: 0.30,
            round_trip: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NotifyPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            sweep_interval_secs: 300,
            default_max_distance_km: 100.0,
            deadline: DeadlinePolicy::default(),
            travel: TravelCostPolicy::default(),
            geocoder_url: None,
            routing_url: None,
            geo_timeout_secs: 10,
            webhook_url: None,
            notify: NotifyPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            sweep_interval_secs: parse_or_default("SWEEP_INTERVAL_SECS", 300)?,
            default_max_distance_km: parse_or_default("DEFAULT_MAX_DISTANCE_KM", 100.0)?,
            deadline: DeadlinePolicy {
                response_window: hours_or_default("RESPONSE_WINDOW_HOURS", 24)?,
                margin_before_shoot: hours_or_default("DEADLINE_MARGIN_HOURS", 12)?,
            },
            travel: TravelCostPolicy {
                free_km: parse_or_default("TRAVEL_FREE_KM", 20.0)?,
                rate_per_km: parse_or_default("TRAVEL_RATE_PER_KM", 0.30)?,
                round_trip: parse_or_default("TRAVEL_ROUND_TRIP", true)?,
            },
            geocoder_url: optional("GEOCODER_URL"),
            routing_url: optional("ROUTING_URL"),
            geo_timeout_secs: parse_or_default("GEO_TIMEOUT_SECS", 10)?,
            webhook_url: optional("WEBHOOK_URL"),
            notify: NotifyPolicy {
                max_attempts: parse_or_default("NOTIFY_MAX_ATTEMPTS", 3)?,
                backoff_ms: parse_or_default("NOTIFY_BACKOFF_MS", 200)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.deadline.response_window <= Duration::zero() {
            return Err(AppError::Internal(
                "RESPONSE_WINDOW_HOURS must be positive".to_string(),
            ));
        }
        if self.deadline.margin_before_shoot < Duration::zero() {
            return Err(AppError::Internal(
                "DEADLINE_MARGIN_HOURS must not be negative".to_string(),
            ));
        }
        let max = Duration::hours(MAX_DEADLINE_HOURS);
        if self.deadline.response_window > max || self.deadline.margin_before_shoot > max {
            return Err(AppError::Internal(format!(
                "RESPONSE_WINDOW_HOURS and DEADLINE_MARGIN_HOURS must be at most {MAX_DEADLINE_HOURS}"
            )));
        }
        for (key, value) in [
            ("TRAVEL_FREE_KM", self.travel.free_km),
            ("TRAVEL_RATE_PER_KM", self.travel.rate_per_km),
            ("DEFAULT_MAX_DISTANCE_KM", self.default_max_distance_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Internal(format!(
                    "{key} must be a non-negative number"
                )));
            }
        }
        if self.sweep_interval_secs == 0 {
            return Err(AppError::Internal(
                "SWEEP_INTERVAL_SECS must be positive".to_string(),
            ));
        }
        if self.notify.max_attempts == 0 {
            return Err(AppError::Internal(
                "NOTIFY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn hours_or_default(key: &str, default: i64) -> Result<Duration, AppError> {
    let hours = parse_or_default(key, default)?;
    Duration::try_hours(hours)
        .ok_or_else(|| AppError::Internal(format!("{key} is out of range: {hours}")))
}
