use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::trace;

use crate::error::KVError;
use crate::traits::KVStore;

/// WatchedKV wraps another KVStore and fans out per-key change signals to
/// in-process subscribers.
///
/// `watch(key)` hands back an `Arc<Notify>` whose waiters are woken after
/// every successful write to that key through this wrapper. `notify_waiters`
/// wakes only already-registered waiters and stores no permit, so a
/// subscriber must create its `notified()` future *before* reading the state
/// it reacts to, or it can miss a wakeup between read and await.
///
/// Writes that bypass the wrapper (another process on the same database
/// file) produce no signal. Consumers that must converge regardless pair a
/// watch with a fixed-interval fallback poll.
pub struct WatchedKV {
    inner: Arc<dyn KVStore>,
    watchers: Mutex<HashMap<String, Arc<Notify>>>,
}

impl WatchedKV {
    pub fn new(inner: Arc<dyn KVStore>) -> Self {
        Self {
            inner,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Get (or lazily create) the change signal for a key.
    pub fn watch(&self, key: &str) -> Arc<Notify> {
        let mut watchers = self.watchers.lock().unwrap();
        Arc::clone(watchers.entry(key.to_string()).or_default())
    }

    /// The wrapped store. Writes through it raise no signals.
    pub fn inner(&self) -> &Arc<dyn KVStore> {
        &self.inner
    }

    fn notify(&self, key: &str) {
        let watchers = self.watchers.lock().unwrap();
        if let Some(signal) = watchers.get(key) {
            trace!(key, "kv change signal");
            signal.notify_waiters();
        }
    }
}

impl KVStore for WatchedKV {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.inner.set(key, value)?;
        self.notify(key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.inner.delete(key)?;
        self.notify(key);
        Ok(())
    }

    fn batch_set(&self, entries: &[(&str, &[u8])]) -> Result<(), KVError> {
        self.inner.batch_set(entries)?;
        for (key, _) in entries {
            self.notify(key);
        }
        Ok(())
    }

    fn batch_delete(&self, keys: &[&str]) -> Result<(), KVError> {
        self.inner.batch_delete(keys)?;
        for key in keys {
            self.notify(key);
        }
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        self.inner.scan(prefix)
    }
}
