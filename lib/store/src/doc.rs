//! DocStore: typed access to one JSON document under one fixed KV key.
//!
//! Every shared collection in the system (order lists, ledger buffers, the
//! user directory, the permission matrix) is a single mutable document:
//! readers load the whole value, writers store back a whole modified copy.
//! A missing key reads as `T::default()`, so a fresh database behaves like
//! empty collections and zeroed buffers.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use shopfloor_core::ServiceError;
use shopfloor_kv::{KVError, KVStore};

/// Map a KV error into the service taxonomy.
pub fn kv_err(e: KVError) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

pub struct DocStore<T> {
    kv: Arc<dyn KVStore>,
    key: &'static str,
    _phantom: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> DocStore<T> {
    pub fn new(kv: Arc<dyn KVStore>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            _phantom: PhantomData,
        }
    }

    /// The KV key this document lives under.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Load the document. A missing key reads as the default value.
    pub fn load(&self) -> Result<T, ServiceError> {
        match self.kv.get(self.key).map_err(kv_err)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| kv_err(KVError::Serialization(format!("{}: {}", self.key, e)))),
            None => Ok(T::default()),
        }
    }

    /// Store the whole document.
    pub fn save(&self, value: &T) -> Result<(), ServiceError> {
        let bytes = encode(self.key, value)?;
        self.kv.set(self.key, &bytes).map_err(kv_err)
    }

    /// Serialize the document for inclusion in a `batch_set` commit, so
    /// several documents can land in one storage transaction.
    pub fn entry(&self, value: &T) -> Result<(&'static str, Vec<u8>), ServiceError> {
        Ok((self.key, encode(self.key, value)?))
    }

    /// Remove the document. The next load returns the default.
    pub fn clear(&self) -> Result<(), ServiceError> {
        self.kv.delete(self.key).map_err(kv_err)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec(value)
        .map_err(|e| kv_err(KVError::Serialization(format!("{}: {}", key, e))))
}
