//! Fan-out refresh of every tracked city into the shared weather cache.
//!
//! Each city is its own failure domain: a failed fetch removes that city's
//! cached snapshot and nothing else. Results are merged only after every
//! request has settled, each into its own key, so completion order does not
//! matter.

use std::sync::Arc;

use futures::future::join_all;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    cache::WeatherCache,
    error::{ProviderError, SyncError},
    model::{Configuration, Location, LocationKey, Unit, WeatherSnapshot},
    provider::WeatherProvider,
};

/// Outcome of a batch refresh.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub updated: Vec<LocationKey>,
    pub failed: Vec<(LocationKey, ProviderError)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Observable progress of batch refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// True while at least one batch is running.
    pub loading: bool,
    /// Number of batches currently running.
    pub in_flight: usize,
    pub last_error: Option<String>,
}

type FetchTask = JoinHandle<Result<WeatherSnapshot, ProviderError>>;

/// One running `sync_all` batch.
///
/// Dropping it, on completion or when the caller's future is dropped, aborts
/// fetches that are still running and releases the batch from the status.
struct Batch<'a> {
    status: &'a watch::Sender<SyncStatus>,
    tasks: Vec<FetchTask>,
}

impl<'a> Batch<'a> {
    fn start(status: &'a watch::Sender<SyncStatus>) -> Self {
        status.send_modify(|s| {
            s.in_flight += 1;
            s.loading = true;
            s.last_error = None;
        });
        Self { status, tasks: Vec::new() }
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.status.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.loading = s.in_flight > 0;
        });
    }
}

#[derive(Debug)]
pub struct WeatherSyncEngine {
    provider: Arc<dyn WeatherProvider>,
    cache: watch::Sender<WeatherCache>,
    status: watch::Sender<SyncStatus>,
}

impl WeatherSyncEngine {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (cache, _) = watch::channel(WeatherCache::new());
        let (status, _) = watch::channel(SyncStatus::default());
        Self { provider, cache, status }
    }

    /// Refreshes every city in `configuration` concurrently.
    ///
    /// Individual city failures are reported in the [`SyncReport`] and never
    /// fail the call. `Err` is returned only when a fetch task itself died;
    /// all other results are merged before that happens.
    ///
    /// Dropping the returned future cancels the fetches still in flight and
    /// leaves the cache untouched.
    pub async fn sync_all(&self, configuration: &Configuration) -> Result<SyncReport, SyncError> {
        let mut batch = Batch::start(&self.status);

        let unit = configuration.unit;
        let (keys, tasks): (Vec<_>, Vec<_>) = configuration
            .cities
            .iter()
            .map(|city| {
                let provider = Arc::clone(&self.provider);
                let city = city.clone();
                let key = city.key();
                let task = tokio::spawn(async move { provider.fetch(&city, unit).await });
                (key, task)
            })
            .unzip();
        batch.tasks = tasks;

        debug!(cities = keys.len(), %unit, "refreshing all cities");
        let outcomes = join_all(batch.tasks.iter_mut()).await;

        let mut report = SyncReport::default();
        let mut broken = None;
        let mut merged = Vec::with_capacity(keys.len());

        for (key, outcome) in keys.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(snapshot)) => {
                    merged.push((key, Some(snapshot)));
                    report.updated.push(key);
                }
                Ok(Err(e)) => {
                    warn!(%key, error = %e, "weather refresh failed");
                    merged.push((key, None));
                    report.failed.push((key, e));
                }
                Err(source) => {
                    error!(%key, error = %source, "weather task did not complete");
                    merged.push((key, None));
                    if broken.is_none() {
                        broken = Some(SyncError::Task { key, source });
                    }
                }
            }
        }

        self.cache.send_modify(|cache| {
            for (key, snapshot) in merged {
                match snapshot {
                    Some(snapshot) => {
                        cache.insert(key, snapshot);
                    }
                    None => {
                        cache.remove(key);
                    }
                }
            }
        });

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "weather refresh finished"
        );

        let last_error = broken.as_ref().map(ToString::to_string);
        self.status.send_modify(|s| s.last_error = last_error);
        drop(batch);

        match broken {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Refreshes one city and hands any failure back to the caller.
    pub async fn sync_one(&self, location: &Location, unit: Unit) -> Result<WeatherSnapshot, ProviderError> {
        let key = location.key();

        match self.provider.fetch(location, unit).await {
            Ok(snapshot) => {
                self.cache.send_modify(|cache| {
                    cache.insert(key, snapshot.clone());
                });
                Ok(snapshot)
            }
            Err(e) => {
                warn!(%key, error = %e, "weather refresh failed");
                self.cache.send_if_modified(|cache| cache.remove(key).is_some());
                Err(e)
            }
        }
    }

    pub fn get(&self, location: &Location) -> Option<WeatherSnapshot> {
        self.cache.borrow().get(location.key()).cloned()
    }

    pub fn clear(&self) {
        self.cache.send_if_modified(|cache| {
            let had_entries = !cache.is_empty();
            cache.clear();
            had_entries
        });
    }

    /// Forgets snapshots of cities no longer in `configuration`.
    pub fn retain_cities(&self, configuration: &Configuration) -> usize {
        let mut removed = 0;
        self.cache.send_if_modified(|cache| {
            removed = cache.retain_tracked(configuration);
            removed > 0
        });
        removed
    }

    /// Clone of the whole cache.
    pub fn cached(&self) -> WeatherCache {
        self.cache.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherCache> {
        self.cache.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }
}
