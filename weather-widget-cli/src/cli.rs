use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_widget_core::{
    ConfigStore, Location, ReverseGeocoder, Settings, Unit, WeatherSyncEngine,
    provider_from_settings,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-widget", version, about = "Current weather for your cities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// List tracked cities.
    List,

    /// Track a city by name and coordinates.
    Add {
        name: String,
        country: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        state: Option<String>,
    },

    /// Look up the city at the given coordinates and track it.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Stop tracking the city at a position (1-based, as shown by `list`).
    Remove { position: usize },

    /// Move a city from one position to another (1-based).
    Move { from: usize, to: usize },

    /// Switch between "celsius" and "fahrenheit".
    Unit { unit: String },

    /// Fetch and show current weather for every tracked city.
    Show,

    /// Refresh a single city (1-based position) and report any failure.
    Refresh { position: usize },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        tracing::debug!(command = ?self.command, "running command");

        // Configure must work even when the settings file or storage is broken.
        if let Command::Configure = self.command {
            let path = Settings::settings_file_path()?;
            return configure(settings_for_configure(&path), &path);
        }

        let settings = Settings::load()?;
        let storage = settings.storage()?;
        let mut store = ConfigStore::new(Arc::new(storage));
        store.load();

        match self.command {
            // Dispatched before the store is opened.
            Command::Configure => {}
            Command::List => render::print_cities(&store.snapshot()),
            Command::Add { name, country, lat, lon, state } => {
                let mut location = Location::new(name, country, lat, lon);
                location.state = state;
                add(&mut store, location)?;
            }
            Command::Locate { lat, lon } => {
                let geocoder = ReverseGeocoder::from_settings(&settings)?;
                let location = geocoder.locate(lat, lon).await?;
                add(&mut store, location)?;
            }
            Command::Remove { position } => {
                let location = city_at(&store, position)?;
                store.remove_city(&location);
                println!("Removed {}", location.display_name());
            }
            Command::Move { from, to } => {
                store.reorder_cities(index(from)?, index(to)?)?;
                render::print_cities(&store.snapshot());
            }
            Command::Unit { unit } => {
                let unit = Unit::try_from(unit.as_str())?;
                if store.change_unit(unit) {
                    println!("Unit set to {unit}");
                } else {
                    println!("Unit already {unit}");
                }
            }
            Command::Show => {
                let engine = WeatherSyncEngine::new(provider_from_settings(&settings)?);
                let config = store.snapshot();
                let report = engine
                    .sync_all(&config)
                    .await
                    .context("Weather refresh did not complete")?;
                render::print_weather(&config, &engine.cached());
                if !report.is_complete() {
                    eprintln!("{} of {} cities could not be refreshed", report.failed.len(), config.cities.len());
                }
            }
            Command::Refresh { position } => {
                let location = city_at(&store, position)?;
                let engine = WeatherSyncEngine::new(provider_from_settings(&settings)?);
                let snapshot = engine.sync_one(&location, store.unit()).await?;
                render::print_snapshot(&location, &snapshot);
            }
        }

        // Pending debounced writes would die with the runtime.
        if store.has_pending_write() {
            store.persist(true);
        }
        Ok(())
    }
}

/// Settings to start `configure` from; an unreadable file is replaced.
fn settings_for_configure(path: &Path) -> Settings {
    Settings::load_from(path).unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable settings file");
        Settings::default()
    })
}

fn configure(mut settings: Settings, path: &Path) -> Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    settings.set_api_key(api_key.trim().to_string());
    settings.save_to(path)?;

    println!("Saved settings to {}", path.display());
    Ok(())
}

fn add(store: &mut ConfigStore, location: Location) -> Result<()> {
    let name = location.display_name();
    if store.add_city(location)? {
        println!("Added {name}");
    } else {
        println!("{name} is already tracked");
    }
    Ok(())
}

fn index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Positions start at 1"))
}

fn city_at(store: &ConfigStore, position: usize) -> Result<Location> {
    let idx = index(position)?;
    store
        .snapshot()
        .cities
        .get(idx)
        .cloned()
        .ok_or_else(|| anyhow!("No city at position {position}. Hint: run `weather-widget list`."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(index(1).unwrap(), 0);
        assert!(index(0).is_err());
    }

    #[test]
    fn configure_starts_over_from_malformed_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "api_key = [").unwrap();

        let mut settings = settings_for_configure(&path);
        assert!(settings.api_key.is_none());

        settings.set_api_key("NEW_KEY".into());
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap().api_key.as_deref(), Some("NEW_KEY"));
    }

    #[test]
    fn configure_keeps_readable_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "base_url = \"http://localhost:9000\"\n").unwrap();

        let settings = settings_for_configure(&path);
        assert_eq!(settings.base_url(), "http://localhost:9000");
    }

    #[test]
    fn parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "weather-widget",
            "add",
            "Buenos Aires",
            "AR",
            "--lat",
            "-34.6037",
            "--lon",
            "-58.3816",
        ])
        .unwrap();

        match cli.command {
            Command::Add { lat, lon, .. } => {
                assert_eq!(lat, -34.6037);
                assert_eq!(lon, -58.3816);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
