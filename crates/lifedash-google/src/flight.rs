//! Per-key single-flight guards.
//!
//! Callers for the same key are serialized behind one async mutex. A caller
//! that waited re-reads shared state after acquiring the guard, so it picks
//! up the result of the caller that went first instead of repeating it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// Registry of in-flight operations keyed by string.
#[derive(Debug, Default)]
pub struct SingleFlight {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held while an operation for one key is in progress.
#[derive(Debug)]
pub struct FlightGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder exists for `key`, then returns a guard.
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            // Slots referenced only by the map are idle.
            slots.retain(|k, slot| k == key || Arc::strong_count(slot) > 1);
            slots.entry(key.to_string()).or_default().clone()
        };
        FlightGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Number of keys with a holder or waiter.
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}
