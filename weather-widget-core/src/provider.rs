use crate::{
    Settings,
    error::ProviderError,
    model::{Location, Unit, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Source of current weather for one location.
///
/// Implementations make exactly one outbound request per call and never
/// retry or cache; both are the caller's business.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, location: &Location, unit: Unit) -> Result<WeatherSnapshot, ProviderError>;
}

/// Construct the OpenWeather provider from settings.
///
/// A missing API key is not an error here; it surfaces from every `fetch`.
pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::with_base_url(settings.api_key(), settings.base_url())?;
    Ok(Arc::new(provider))
}
