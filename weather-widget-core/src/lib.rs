//! Core library for the weather widget.
//!
//! This crate defines:
//! - The tracked-city configuration and its persistence (`ConfigStore`)
//! - Concurrent per-city weather refresh into a keyed cache (`WeatherSyncEngine`)
//! - The OpenWeather provider and reverse geocoder
//! - Application settings and display helpers
//!
//! It is used by `weather-widget-cli`, but can be embedded by any front end
//! that wants to observe the configuration and cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod storage;
pub mod store;
pub mod sync;

pub use cache::WeatherCache;
pub use config::Settings;
pub use error::{GeocodeError, ProviderError, StorageError, SyncError, ValidationError};
pub use geocode::ReverseGeocoder;
pub use model::{Configuration, Location, LocationKey, Unit, WeatherSnapshot};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_settings};
pub use storage::{FileStorage, MemoryStorage, STORAGE_KEY, Storage};
pub use store::ConfigStore;
pub use sync::{SyncReport, SyncStatus, WeatherSyncEngine};
