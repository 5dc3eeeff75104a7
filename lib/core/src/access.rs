//! Capability checks for mutating operations.
//!
//! The core does not own identity. Every mutating operation receives the
//! acting username in its request and asks one pluggable checker whether
//! that actor may touch a resource path (`/operator`, `/kitting`,
//! `/constructor`, `/ax`). The concrete implementation is injected at
//! startup time; the directory module ships a matrix-backed one.

use crate::ServiceError;

/// Access level required for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    Write,
}

/// Pluggable capability checker.
pub trait Access: Send + Sync + 'static {
    /// Check whether `actor` may use `path` at the given level.
    ///
    /// Returns `Ok(())` if allowed, `Err(ServiceError::PermissionDenied)`
    /// if not.
    fn check(&self, actor: &str, path: &str, level: AccessLevel) -> Result<(), ServiceError>;
}

/// A checker that allows everything. Used for testing and for
/// single-operator deployments without a permission matrix.
pub struct AllowAll;

impl Access for AllowAll {
    fn check(&self, _actor: &str, _path: &str, _level: AccessLevel) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// A checker that denies everything. Used for testing.
pub struct DenyAll;

impl Access for DenyAll {
    fn check(&self, actor: &str, path: &str, _level: AccessLevel) -> Result<(), ServiceError> {
        Err(ServiceError::PermissionDenied(format!(
            "'{actor}' has no access to {path}"
        )))
    }
}
