use jiff::SignedDuration;
use thiserror::Error;
use waymark_directions::{OrsDirectionsClientParams, RoutePreference};

use crate::{admission::AdmissionConfig, location::LocationFilter, map_view::EdgePadding};

pub const API_KEY_ENV_VAR: &str = "ORS_API_KEY";
pub const DAILY_QUOTA_ENV_VAR: &str = "WAYMARK_DAILY_QUOTA";
pub const SAFETY_FRACTION_ENV_VAR: &str = "WAYMARK_SAFETY_FRACTION";
pub const MIN_INTERVAL_ENV_VAR: &str = "WAYMARK_MIN_INTERVAL_MS";
pub const BYPASS_GUARD_ENV_VAR: &str = "WAYMARK_BYPASS_GUARD";
pub const MAX_FIX_ACCURACY_ENV_VAR: &str = "WAYMARK_MAX_FIX_ACCURACY_M";
pub const DENSIFY_ENV_VAR: &str = "WAYMARK_DENSIFY";
pub const PREFERENCE_ENV_VAR: &str = "WAYMARK_PREFERENCE";
pub const GEOMETRY_SIMPLIFY_ENV_VAR: &str = "WAYMARK_GEOMETRY_SIMPLIFY";
/// Comma separated, e.g. "waytype,surface".
pub const EXTRA_INFO_ENV_VAR: &str = "WAYMARK_EXTRA_INFO";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value \"{value}\"")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be within {range}, got {value}")]
    OutOfRange {
        key: &'static str,
        range: &'static str,
        value: String,
    },
}

/// Request shaping forwarded to the directions client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectionsOptions {
    pub preference: Option<RoutePreference>,
    pub geometry_simplify: Option<bool>,
    pub extra_info: Vec<String>,
    pub densify: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    pub api_key: Option<String>,
    pub admission: AdmissionConfig,
    pub location_filter: LocationFilter,
    pub directions: DirectionsOptions,
    pub camera_padding: EdgePadding,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SessionConfig {
            api_key: lookup(API_KEY_ENV_VAR).filter(|key| !key.trim().is_empty()),
            ..Default::default()
        };

        if let Some(value) = lookup(DAILY_QUOTA_ENV_VAR) {
            config.admission.daily_quota = parse(DAILY_QUOTA_ENV_VAR, &value)?;
        }

        if let Some(value) = lookup(SAFETY_FRACTION_ENV_VAR) {
            let fraction: f64 = parse(SAFETY_FRACTION_ENV_VAR, &value)?;
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ConfigError::OutOfRange {
                    key: SAFETY_FRACTION_ENV_VAR,
                    range: "[0, 1]",
                    value,
                });
            }
            config.admission.safety_fraction = fraction;
        }

        if let Some(value) = lookup(MIN_INTERVAL_ENV_VAR) {
            let millis: u32 = parse(MIN_INTERVAL_ENV_VAR, &value)?;
            config.admission.min_interval = SignedDuration::from_millis(millis as i64);
        }

        if let Some(value) = lookup(BYPASS_GUARD_ENV_VAR) {
            config.admission.bypass_guard = parse_bool(BYPASS_GUARD_ENV_VAR, &value)?;
        }

        if let Some(value) = lookup(MAX_FIX_ACCURACY_ENV_VAR) {
            let meters: f64 = parse(MAX_FIX_ACCURACY_ENV_VAR, &value)?;
            if !meters.is_finite() || meters < 0.0 {
                return Err(ConfigError::OutOfRange {
                    key: MAX_FIX_ACCURACY_ENV_VAR,
                    range: "[0, inf)",
                    value,
                });
            }
            config.location_filter.max_accuracy_meters = Some(meters);
        }

        if let Some(value) = lookup(DENSIFY_ENV_VAR) {
            config.directions.densify = parse_bool(DENSIFY_ENV_VAR, &value)?;
        }

        if let Some(value) = lookup(PREFERENCE_ENV_VAR) {
            config.directions.preference = Some(parse(PREFERENCE_ENV_VAR, &value)?);
        }

        if let Some(value) = lookup(GEOMETRY_SIMPLIFY_ENV_VAR) {
            config.directions.geometry_simplify =
                Some(parse_bool(GEOMETRY_SIMPLIFY_ENV_VAR, &value)?);
        }

        if let Some(value) = lookup(EXTRA_INFO_ENV_VAR) {
            config.directions.extra_info = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    pub fn client_params(&self) -> OrsDirectionsClientParams {
        OrsDirectionsClientParams {
            api_key: self.api_key.clone(),
            preference: self.directions.preference,
            geometry_simplify: self.directions.geometry_simplify,
            extra_info: self.directions.extra_info.clone(),
            densify: self.directions.densify,
            ..Default::default()
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
