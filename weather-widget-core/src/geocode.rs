//! Reverse geocoding: turn device coordinates into a trackable [`Location`].
//! Uses the OpenWeather geocoding API with the same credential as the weather provider.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    Settings,
    error::GeocodeError,
    model::Location,
    provider::openweather::{DEFAULT_BASE_URL, REQUEST_TIMEOUT},
};

#[derive(Debug, Deserialize)]
struct GeoEntry {
    name: String,
    country: String,
    state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl ReverseGeocoder {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        Self::new(settings.api_key(), settings.base_url())
    }

    pub fn openweather(api_key: Option<String>) -> Result<Self, reqwest::Error> {
        Self::new(api_key, DEFAULT_BASE_URL)
    }

    /// Best-guess city for the given coordinates.
    ///
    /// The returned location keeps the caller's coordinates; only the names
    /// come from the geocoder.
    pub async fn locate(&self, lat: f64, lon: f64) -> Result<Location, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingCredential)?;

        let res = self
            .http
            .get(format!("{}/geo/1.0/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("limit", "1".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            debug!("Reverse geocode returned status {}", res.status());
            return Err(GeocodeError::Status(res.status().as_u16()));
        }

        let entries: Vec<GeoEntry> = res.json().await?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or(GeocodeError::NotFound { lat, lon })?;

        let location = Location {
            name: entry.name,
            country: entry.country,
            state: entry.state,
            lat,
            lon,
        };
        location.validate()?;

        info!("Reverse geocoded to: {}", location.display_name());
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locate_without_key_fails_fast() {
        let geocoder = ReverseGeocoder::new(None, "http://127.0.0.1:9").unwrap();

        let err = geocoder.locate(48.8566, 2.3522).await.unwrap_err();
        assert!(matches!(err, GeocodeError::MissingCredential));
    }
}
