//! Error types for the widget core.
//!
//! Failures are split by who is expected to handle them: validation errors
//! reject a single mutation, storage errors are logged and swallowed by the
//! config store, provider errors are isolated per city during batch sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::LocationKey;

/// A mutation was rejected because its input was malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("location name must not be empty")]
    EmptyName,

    #[error("location '{name}' has no country")]
    EmptyCountry { name: String },

    #[error("coordinates must be finite numbers (lat={lat}, lon={lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("cannot move city from index {from} to {to}: only {len} cities tracked")]
    IndexOutOfRange { from: usize, to: usize, len: usize },
}

/// Durable storage could not be read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A single weather request failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("OpenWeather API key is missing")]
    MissingCredential,

    #[error("Failed to fetch weather for {city}: request timed out")]
    Timeout { city: String },

    #[error("Failed to fetch weather for {city}: {source}")]
    Request {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch weather for {city}: status {status}: {message}")]
    Status {
        city: String,
        status: u16,
        message: String,
    },

    #[error("Failed to fetch weather for {city}: malformed response: {source}")]
    Decode {
        city: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to fetch weather for {city}: no weather information available")]
    NoConditions { city: String },
}

/// Reverse geocoding of device coordinates failed.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("OpenWeather API key is missing")]
    MissingCredential,

    #[error("Failed to get city from coordinates: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to get city from coordinates: status {0}")]
    Status(u16),

    #[error("No location found for coordinates ({lat}, {lon})")]
    NotFound { lat: f64, lon: f64 },

    #[error("Geocoder returned an unusable location: {0}")]
    Invalid(#[from] ValidationError),
}

/// The batch sync itself broke down (as opposed to an individual city failing).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("weather task for {key} did not complete: {source}")]
    Task {
        key: LocationKey,
        #[source]
        source: tokio::task::JoinError,
    },
}
