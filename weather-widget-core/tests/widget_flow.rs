//! End-to-end flows across the config store, sync engine and storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use weather_widget_core::{
    ConfigStore, FileStorage, Location, MemoryStorage, OpenWeatherProvider, ProviderError, Unit,
    WeatherProvider, WeatherSnapshot, WeatherSyncEngine,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers every request with a fixed temperature, except for one failing city.
#[derive(Debug)]
struct FixedTemp {
    temperature: f64,
    failing: Option<String>,
}

#[async_trait]
impl WeatherProvider for FixedTemp {
    async fn fetch(&self, location: &Location, unit: Unit) -> Result<WeatherSnapshot, ProviderError> {
        if self.failing.as_deref() == Some(location.name.as_str()) {
            return Err(ProviderError::NoConditions { city: location.name.clone() });
        }

        Ok(WeatherSnapshot {
            city: location.name.clone(),
            country: location.country.clone(),
            temperature: self.temperature,
            feels_like: self.temperature,
            humidity: 55,
            pressure: 1015.0,
            wind_speed: 1.2,
            description: "clear sky".into(),
            icon_id: "01d".into(),
            icon_url: "https://openweathermap.org/img/wn/01d@2x.png".into(),
            lat: Some(location.lat),
            lon: Some(location.lon),
            unit,
            observed_at: Utc::now(),
        })
    }
}

fn paris() -> Location {
    Location::new("Paris", "FR", 48.8566, 2.3522)
}

#[tokio::test]
async fn test_paris_scenario() {
    let mut store = ConfigStore::new(Arc::new(MemoryStorage::new()));

    store.add_city(paris()).unwrap();
    store.add_city(paris()).unwrap();
    assert_eq!(store.len(), 1);

    store.change_unit(Unit::Fahrenheit);

    let engine = WeatherSyncEngine::new(Arc::new(FixedTemp {
        temperature: 70.0,
        failing: None,
    }));
    engine.sync_all(&store.snapshot()).await.unwrap();

    let snapshot = engine.get(&paris()).expect("Paris must be cached");
    assert_eq!(snapshot.temperature, 70.0);
    assert_eq!(snapshot.unit, Unit::Fahrenheit);
}

#[tokio::test]
async fn test_removed_city_is_pruned_and_failed_city_shows_no_data() {
    let berlin = Location::new("Berlin", "DE", 52.52, 13.405);
    let rome = Location::new("Rome", "IT", 41.9028, 12.4964);

    let mut store = ConfigStore::new(Arc::new(MemoryStorage::new()));
    for city in [paris(), berlin.clone(), rome.clone()] {
        store.add_city(city).unwrap();
    }

    let engine = WeatherSyncEngine::new(Arc::new(FixedTemp {
        temperature: 12.0,
        failing: Some("Rome".into()),
    }));
    let report = engine.sync_all(&store.snapshot()).await.unwrap();
    assert_eq!(report.updated.len(), 2);
    assert_eq!(report.failed.len(), 1);

    store.remove_city(&berlin);
    assert_eq!(engine.retain_cities(&store.snapshot()), 1);

    assert!(engine.get(&paris()).is_some());
    assert!(engine.get(&berlin).is_none());
    assert!(engine.get(&rome).is_none());
}

#[tokio::test]
async fn test_file_storage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut store = ConfigStore::new(Arc::new(FileStorage::new(dir.path())));
        store.load();
        store.add_city(paris()).unwrap();
        store.add_city(Location::new("Oslo", "NO", 59.9139, 10.7522)).unwrap();
        store.reorder_cities(1, 0).unwrap();
        store.change_unit(Unit::Fahrenheit);
        store.persist(true);
    }

    let mut store = ConfigStore::new(Arc::new(FileStorage::new(dir.path())));
    store.load();

    let cfg = store.snapshot();
    assert_eq!(cfg.unit, Unit::Fahrenheit);
    let names: Vec<_> = cfg.cities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Oslo", "Paris"]);
}

#[tokio::test]
async fn test_sync_all_against_mock_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "48.8566"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "weather": [{ "description": "clear sky", "icon": "01d" }],
            "main": { "temp": 19.5, "feels_like": 19.0, "humidity": 60, "pressure": 1018 },
            "wind": { "speed": 2.1 }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "0"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&mock_server)
        .await;

    let mut store = ConfigStore::new(Arc::new(MemoryStorage::new()));
    store.add_city(paris()).unwrap();
    store.add_city(Location::new("Null Island", "XX", 0.0, 0.0)).unwrap();

    let provider = OpenWeatherProvider::with_base_url(Some("KEY".into()), mock_server.uri()).unwrap();
    let engine = WeatherSyncEngine::new(Arc::new(provider));

    let report = engine.sync_all(&store.snapshot()).await.unwrap();

    assert_eq!(report.updated, vec![paris().key()]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.to_string().contains("city not found"));
    assert_eq!(engine.get(&paris()).map(|s| s.temperature), Some(19.5));
}
