use crate::error::KVError;

/// KVStore provides the shared key-value storage interface.
///
/// Every shared document in the system (order collections, ledger buffers,
/// the user directory, the permission matrix) lives under one well-known
/// string key, serialized as JSON. Consistency across writers is last write
/// wins per key; callers needing several keys to land together use
/// `batch_set`.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Set several keys at once. Backends with transactional writes commit
    /// the whole batch atomically; the default falls back to sequential sets.
    fn batch_set(&self, entries: &[(&str, &[u8])]) -> Result<(), KVError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several keys at once. Same atomicity note as `batch_set`.
    fn batch_delete(&self, keys: &[&str]) -> Result<(), KVError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
