use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Temperature unit the widget displays and requests from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Celsius => "celsius",
            Unit::Fahrenheit => "fahrenheit",
        }
    }

    /// Value of the `units` query parameter understood by OpenWeather.
    pub fn api_units(&self) -> &'static str {
        match self {
            Unit::Celsius => "metric",
            Unit::Fahrenheit => "imperial",
        }
    }

    /// Strict parse: only the two exact lowercase literals are accepted.
    pub fn from_literal(value: &str) -> Option<Self> {
        match value {
            "celsius" => Some(Unit::Celsius),
            "fahrenheit" => Some(Unit::Fahrenheit),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Unit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Unit::from_literal(&value.to_lowercase()).ok_or_else(|| {
            anyhow::anyhow!("Unknown unit '{value}'. Supported units: celsius, fahrenheit.")
        })
    }
}

/// A tracked city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            state: None,
            lat,
            lon,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn key(&self) -> LocationKey {
        LocationKey::new(self.lat, self.lon)
    }

    /// Checks the record is usable: non-blank name and country, finite coordinates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.country.trim().is_empty() {
            return Err(ValidationError::EmptyCountry { name: self.name.clone() });
        }
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(ValidationError::InvalidCoordinates {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }

    /// "Paris, FR" or "Springfield, IL, US".
    pub fn display_name(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// Identity of a [`Location`]: the exact bit patterns of its coordinates.
///
/// Two locations are the same city iff both coordinates are bit-identical.
/// `-0.0` is folded into `0.0` so that the two zero encodings do not produce
/// distinct cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl LocationKey {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat_bits: normalize_zero(lat).to_bits(),
            lon_bits: normalize_zero(lon).to_bits(),
        }
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }

    pub fn lon(&self) -> f64 {
        f64::from_bits(self.lon_bits)
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat(), self.lon())
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

/// Persisted widget state: tracked cities in display order plus the unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub cities: Vec<Location>,
    pub unit: Unit,
}

impl Configuration {
    pub fn contains(&self, key: LocationKey) -> bool {
        self.cities.iter().any(|c| c.key() == key)
    }
}

/// One point-in-time weather reading for a tracked city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon_id: String,
    pub icon_url: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub unit: Unit,
    pub observed_at: DateTime<Utc>,
}
