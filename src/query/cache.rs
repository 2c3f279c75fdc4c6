//! Reactive query cache keyed by [`QueryKey`]
//!
//! Entries hold the last server response for a key. Reads through
//! [`QueryCache::fetch_query`] return cached data while it is fresh and refetch
//! once it is stale or invalidated. Every change is broadcast as a
//! [`CacheEvent`] so views can re-read.
//!
//! Entries not written for longer than the GC time are swept on the next
//! write, so keys that are no longer read (old searches, date ranges) do not
//! accumulate. Entries with a fetch in flight are never swept.

use super::keys::QueryKey;
use crate::api::error::ApiResult;
use crate::api::models::Task;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, trace};

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 256;

/// How long an entry survives without being written
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// A cached server response
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Tasks(Vec<Task>),
    Task(Task),
}

/// Conversion between a typed query result and [`QueryData`]
pub trait QueryValue: Sized {
    fn into_data(self) -> QueryData;
    fn from_data(data: &QueryData) -> Option<Self>;
}

impl QueryValue for Vec<Task> {
    fn into_data(self) -> QueryData {
        QueryData::Tasks(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Tasks(tasks) => Some(tasks.clone()),
            _ => None,
        }
    }
}

impl QueryValue for Task {
    fn into_data(self) -> QueryData {
        QueryData::Task(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Task(task) => Some(task.clone()),
            _ => None,
        }
    }
}

/// Change notification for subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Removed(QueryKey),
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<QueryData>,
    updated_at: Option<Instant>,
    invalidated: bool,
    /// Bumped by cancel/invalidate; a fetch only stores its result if the
    /// generation it started with is still current.
    generation: u64,
    /// Fetches currently running for this key
    fetching: usize,
}

impl CacheEntry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.is_some_and(|t| t.elapsed() < stale_time)
    }

    fn is_collectable(&self, gc_time: Duration) -> bool {
        self.fetching == 0 && self.updated_at.map_or(true, |t| t.elapsed() >= gc_time)
    }
}

/// Shared, cloneable query cache
#[derive(Debug, Clone)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<QueryKey, CacheEntry>>>,
    events: broadcast::Sender<CacheEvent>,
    gc_time: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
            gc_time: DEFAULT_GC_TIME,
        }
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    /// Number of keys currently held, including ones with a fetch in flight
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop entries older than the GC time. Caller holds the write lock and
    /// emits the returned keys once it is released.
    fn sweep(&self, entries: &mut HashMap<QueryKey, CacheEntry>) -> Vec<QueryKey> {
        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, e)| e.is_collectable(self.gc_time))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Garbage-collected queries");
        }
        expired
    }

    fn emit_removed(&self, keys: Vec<QueryKey>) {
        for key in keys {
            self.emit(CacheEvent::Removed(key));
        }
    }

    /// Subscribe to cache change events
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Exact-key lookup
    pub async fn get_query_data(&self, key: &QueryKey) -> Option<QueryData> {
        self.entries
            .read()
            .await
            .get(key)
            .and_then(|e| e.data.clone())
    }

    /// Every entry with data whose key starts with `prefix`
    pub async fn get_queries_data(&self, prefix: &QueryKey) -> Vec<(QueryKey, QueryData)> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, e)| e.data.clone().map(|d| (key.clone(), d)))
            .collect()
    }

    /// Store data for a key, marking it fresh
    pub async fn set_query_data(&self, key: QueryKey, data: QueryData) {
        let swept = {
            let mut entries = self.entries.write().await;
            let swept = self.sweep(&mut entries);
            let entry = entries.entry(key.clone()).or_default();
            entry.data = Some(data);
            entry.updated_at = Some(Instant::now());
            entry.invalidated = false;
            swept
        };
        self.emit_removed(swept);
        self.emit(CacheEvent::Updated(key));
    }

    /// Apply `updater` to every entry under `prefix` that holds data.
    /// Returns the number of entries updated.
    pub async fn set_queries_data<F>(&self, prefix: &QueryKey, mut updater: F) -> usize
    where
        F: FnMut(QueryData) -> QueryData,
    {
        let mut updated = Vec::new();
        {
            let mut entries = self.entries.write().await;
            for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
                if let Some(data) = entry.data.take() {
                    entry.data = Some(updater(data));
                    entry.updated_at = Some(Instant::now());
                    updated.push(key.clone());
                }
            }
        }
        let count = updated.len();
        for key in updated {
            self.emit(CacheEvent::Updated(key));
        }
        count
    }

    /// Put back entries captured by [`QueryCache::get_queries_data`]
    pub async fn restore(&self, snapshot: Vec<(QueryKey, QueryData)>) {
        for (key, data) in snapshot {
            self.set_query_data(key, data).await;
        }
    }

    /// Mark every entry under `prefix` stale so the next read refetches.
    /// In-flight fetches for those keys will not store their result.
    pub async fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let mut invalidated = Vec::new();
        {
            let mut entries = self.entries.write().await;
            for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
                entry.invalidated = true;
                entry.generation += 1;
                invalidated.push(key.clone());
            }
        }
        debug!(prefix = %prefix, count = invalidated.len(), "Invalidated queries");
        let count = invalidated.len();
        for key in invalidated {
            self.emit(CacheEvent::Invalidated(key));
        }
        count
    }

    /// Prevent in-flight fetches under `prefix` from writing their result
    pub async fn cancel_queries(&self, prefix: &QueryKey) {
        let mut entries = self.entries.write().await;
        for (_, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
            entry.generation += 1;
        }
        trace!(prefix = %prefix, "Cancelled in-flight queries");
    }

    /// Drop every entry under `prefix`
    pub async fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let removed: Vec<QueryKey> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<QueryKey> = entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };
        let count = removed.len();
        self.emit_removed(removed);
        count
    }

    /// True when the key has no data, was invalidated, or is older than `stale_time`
    pub async fn is_stale(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| !e.is_fresh(stale_time))
            .unwrap_or(true)
    }

    /// Return fresh cached data for `key`, or run `fetcher` and cache its result.
    ///
    /// If the key is cancelled or invalidated while `fetcher` runs, the result
    /// is still returned to the caller but not stored. A key that ends up with
    /// no data (failed or discarded first fetch) is dropped.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        stale_time: Duration,
        fetcher: F,
    ) -> ApiResult<T>
    where
        T: QueryValue + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.is_fresh(stale_time) {
                    if let Some(value) = entry.data.as_ref().and_then(T::from_data) {
                        trace!(key = %key, "Query cache hit");
                        return Ok(value);
                    }
                }
            }
        }

        let (generation, swept) = {
            let mut entries = self.entries.write().await;
            let swept = self.sweep(&mut entries);
            let entry = entries.entry(key.clone()).or_default();
            entry.fetching += 1;
            (entry.generation, swept)
        };
        self.emit_removed(swept);

        debug!(key = %key, "Fetching query");
        let result = fetcher().await;

        let stored = {
            let mut entries = self.entries.write().await;
            let stored = match entries.get_mut(&key) {
                Some(entry) => {
                    entry.fetching = entry.fetching.saturating_sub(1);
                    match result {
                        Ok(ref value) if entry.generation == generation => {
                            entry.data = Some(value.clone().into_data());
                            entry.updated_at = Some(Instant::now());
                            entry.invalidated = false;
                            true
                        }
                        _ => false,
                    }
                }
                None => false,
            };
            if entries
                .get(&key)
                .is_some_and(|e| e.fetching == 0 && e.data.is_none())
            {
                entries.remove(&key);
            }
            stored
        };

        let value = result?;
        if stored {
            self.emit(CacheEvent::Updated(key));
        } else {
            debug!(key = %key, "Discarding result of cancelled fetch");
        }

        Ok(value)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
