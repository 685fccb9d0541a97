//! Owner of the tracked-city list and active unit.
//!
//! Every mutation applies synchronously to the in-memory [`Configuration`]
//! and, when it changed something, schedules a debounced write to storage.
//! Observers get change notifications through [`ConfigStore::subscribe`].

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, error, warn};

use crate::{
    error::{StorageError, ValidationError},
    model::{Configuration, Location, Unit},
    storage::{STORAGE_KEY, Storage},
};

/// Writes scheduled within this window of each other collapse into one.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct ConfigStore {
    state: watch::Sender<Configuration>,
    storage: Arc<dyn Storage>,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
    /// Sequence handed to the next write; later writes carry newer state.
    next_seq: u64,
    /// Sequence of the last write that reached storage.
    written: Arc<Mutex<u64>>,
}

impl ConfigStore {
    /// Creates a store holding the default configuration. Call [`load`](Self::load)
    /// to pick up what was persisted.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (state, _) = watch::channel(Configuration::default());
        Self {
            state,
            storage,
            debounce: DEBOUNCE_WINDOW,
            pending: None,
            next_seq: 0,
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn snapshot(&self) -> Configuration {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Configuration> {
        self.state.subscribe()
    }

    pub fn unit(&self) -> Unit {
        self.state.borrow().unit
    }

    pub fn len(&self) -> usize {
        self.state.borrow().cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the persisted configuration.
    ///
    /// Never fails: a missing record leaves the defaults in place, a record
    /// that does not parse is wiped, and malformed city entries are dropped.
    pub fn load(&mut self) {
        let raw = match self.storage.read(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored configuration, using defaults");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to read stored configuration, using defaults");
                return;
            }
        };

        let loaded = parse_configuration(&raw).unwrap_or_else(|| {
            warn!("stored configuration is corrupted, discarding it");
            if let Err(e) = self.storage.remove(STORAGE_KEY) {
                error!(error = %e, "failed to wipe corrupted configuration");
            }
            Configuration::default()
        });

        debug!(cities = loaded.cities.len(), unit = %loaded.unit, "configuration loaded");
        self.state.send_replace(loaded);
    }

    /// Appends `location` unless a city with the same coordinates is already
    /// tracked. Returns whether the list changed.
    pub fn add_city(&mut self, location: Location) -> Result<bool, ValidationError> {
        if let Err(e) = location.validate() {
            warn!(error = %e, ?location, "rejected malformed city");
            return Err(e);
        }

        let key = location.key();
        let added = self.state.send_if_modified(|cfg| {
            if cfg.contains(key) {
                return false;
            }
            cfg.cities.push(location);
            true
        });

        if added {
            self.schedule_persist();
        } else {
            debug!(%key, "city already tracked");
        }
        Ok(added)
    }

    /// Removes every city sharing `location`'s coordinates.
    pub fn remove_city(&mut self, location: &Location) -> bool {
        let key = location.key();
        let removed = self.state.send_if_modified(|cfg| {
            let before = cfg.cities.len();
            cfg.cities.retain(|c| c.key() != key);
            cfg.cities.len() != before
        });

        if removed {
            self.schedule_persist();
        }
        removed
    }

    /// Moves the city at `from` so that it ends up at index `to`.
    pub fn reorder_cities(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.len();
        if from >= len || to >= len {
            let e = ValidationError::IndexOutOfRange { from, to, len };
            warn!(error = %e, "rejected reorder");
            return Err(e);
        }

        let moved = self.state.send_if_modified(|cfg| {
            if from == to {
                return false;
            }
            let city = cfg.cities.remove(from);
            cfg.cities.insert(to, city);
            true
        });

        if moved {
            self.schedule_persist();
        }
        Ok(())
    }

    /// Returns whether the unit actually changed.
    pub fn change_unit(&mut self, unit: Unit) -> bool {
        let changed = self.state.send_if_modified(|cfg| {
            if cfg.unit == unit {
                return false;
            }
            cfg.unit = unit;
            true
        });

        if changed {
            self.schedule_persist();
        }
        changed
    }

    /// Writes the current configuration to storage.
    ///
    /// An immediate persist cancels any pending debounced write and stores
    /// synchronously. Otherwise the write is (re)scheduled after the debounce
    /// window, replacing whatever was pending. Failures are logged only.
    pub fn persist(&mut self, immediate: bool) {
        if immediate {
            self.cancel_pending();
            let seq = self.take_seq();
            write_config(self.storage.as_ref(), &self.written, seq, &self.snapshot());
        } else {
            self.schedule_persist();
        }
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn schedule_persist(&mut self) {
        self.cancel_pending();

        let config = self.snapshot();
        let seq = self.take_seq();
        let Ok(runtime) = Handle::try_current() else {
            // No timer to debounce with outside a runtime.
            write_config(self.storage.as_ref(), &self.written, seq, &config);
            return;
        };

        let storage = Arc::clone(&self.storage);
        let written = Arc::clone(&self.written);
        let window = self.debounce;
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            write_config(storage.as_ref(), &written, seq, &config);
        }));
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Writes `config` unless a write scheduled after it already landed.
///
/// An aborted debounce task may already be past its timer, so writes are
/// serialized under `written` and an older one never replaces a newer one.
fn write_config(storage: &dyn Storage, written: &Mutex<u64>, seq: u64, config: &Configuration) {
    let mut last = written.lock();
    if seq < *last {
        debug!(seq, last = *last, "skipping superseded configuration write");
        return;
    }

    let result = serde_json::to_string(config)
        .map_err(StorageError::from)
        .and_then(|json| storage.write(STORAGE_KEY, &json));

    match result {
        Ok(()) => {
            *last = seq;
            debug!(cities = config.cities.len(), unit = %config.unit, "configuration persisted");
        }
        Err(e) => error!(error = %e, "failed to persist configuration"),
    }
}

/// Lenient decode of the stored blob. `None` means the blob is unusable as a
/// whole; individual bad city entries and an unknown unit are tolerated.
fn parse_configuration(raw: &str) -> Option<Configuration> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let obj = value.as_object()?;

    let cities = obj
        .get("cities")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_city).collect())
        .unwrap_or_default();

    let unit = obj
        .get("unit")
        .and_then(Value::as_str)
        .and_then(Unit::from_literal)
        .unwrap_or_default();

    Some(Configuration { cities, unit })
}

fn parse_city(value: &Value) -> Option<Location> {
    let obj = value.as_object()?;

    let location = Location {
        name: obj.get("name")?.as_str()?.to_owned(),
        country: obj.get("country")?.as_str()?.to_owned(),
        state: obj.get("state").and_then(Value::as_str).map(str::to_owned),
        lat: obj.get("lat")?.as_f64()?,
        lon: obj.get("lon")?.as_f64()?,
    };

    match location.validate() {
        Ok(()) => Some(location),
        Err(e) => {
            debug!(error = %e, "dropping stored city");
            None
        }
    }
}
