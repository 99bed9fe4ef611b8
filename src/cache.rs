//! # TTL Cache with Single-Flight De-duplication
//!
//! Memoizes adapter output per data kind. Within the TTL window every caller
//! for a key gets the cached value without touching the network; concurrent
//! callers for a cold or expired key collapse onto one in-flight fetch.
//!
//! The locking split is deliberate: a brief standard mutex guards the
//! key→slot map (never held across an await), and a per-key async mutex is
//! held for the duration of the fetch so late arrivals queue behind it and
//! then read the freshly stored value.
//!
//! Stale values are never served: an expired entry is treated exactly like a
//! missing one, and a failed refresh propagates its error instead of
//! resurrecting old data.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;

use crate::FetchError;

struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

type Slot<T> = Arc<AsyncMutex<Option<Entry<T>>>>;

/// Per-data-kind cache: one instance per adapter, keyed by location name.
pub struct SingleFlight<T> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new(ttl: Duration) -> Self {
        SingleFlight {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key` if fresh, otherwise run `fetch` and
    /// store its result.
    ///
    /// Errors from `fetch` propagate to the caller; the previous (expired)
    /// entry is left untouched and remains unservable.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let slot = {
            let mut slots = self.slots.lock().expect("cache slot map lock");
            slots.entry(key.to_string()).or_default().clone()
        };

        // Holding the slot lock across the fetch is what collapses
        // concurrent callers into a single flight.
        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.value.clone());
            }
        }

        let value = fetch().await?;
        *guard = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }
}
