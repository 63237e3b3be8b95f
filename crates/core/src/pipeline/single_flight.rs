//! Per-URL in-flight locks.
//!
//! When enabled, concurrent scrapes of the same URL queue behind one
//! another; the waiter re-reads the cache once it holds the lock, so only
//! the first request computes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct InFlight {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request holds `key`, then hold it.
    pub async fn acquire(&self, key: &str) -> InFlightGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        InFlightGuard { key: key.to_string(), locks: self.locks.clone(), guard: Some(guard) }
    }

    /// Number of keys with a holder or waiter.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the key on drop and forgets it once nobody is waiting.
#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(lock) = locks.get(&self.key)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let in_flight = Arc::new(InFlight::new());
        let first = in_flight.acquire("https://example.com").await;

        let waiter = {
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                let _guard = in_flight.acquire("https://example.com").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let in_flight = InFlight::new();
        let _a = in_flight.acquire("https://a.example").await;
        let _b = tokio::time::timeout(Duration::from_millis(50), in_flight.acquire("https://b.example"))
            .await
            .expect("distinct key should not wait");
        assert_eq!(in_flight.len(), 2);
    }
}
