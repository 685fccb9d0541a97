use std::collections::HashMap;

use crate::model::{Configuration, LocationKey, WeatherSnapshot};

/// Latest known weather per tracked city.
///
/// An absent key means there is no current value for that city, either because
/// it was never fetched or because its last refresh failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherCache {
    entries: HashMap<LocationKey, WeatherSnapshot>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: LocationKey) -> Option<&WeatherSnapshot> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: LocationKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Replaces any previous snapshot for `key`.
    pub fn insert(&mut self, key: LocationKey, snapshot: WeatherSnapshot) -> Option<WeatherSnapshot> {
        self.entries.insert(key, snapshot)
    }

    pub fn remove(&mut self, key: LocationKey) -> Option<WeatherSnapshot> {
        self.entries.remove(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops entries for cities that are no longer tracked. Returns how many
    /// were removed.
    pub fn retain_tracked(&mut self, configuration: &Configuration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| configuration.contains(*key));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationKey, &WeatherSnapshot)> {
        self.entries.iter()
    }
}
