//! User directory module: accounts, the permission matrix and the board
//! format catalog behind `/directory`.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use shopfloor_core::{Module, ServiceError};
use shopfloor_kv::KVStore;

pub use model::{AuthSession, BoardFormat, PermMatrix, Permission, User};
pub use service::{DirectoryService, MatrixAccess};

pub struct DirectoryModule {
    service: Arc<DirectoryService>,
}

impl DirectoryModule {
    /// Open the directory over the shared store and seed first-run data.
    pub fn new(kv: Arc<dyn KVStore>) -> Result<Self, ServiceError> {
        let service = Arc::new(DirectoryService::new(kv));
        service.seed()?;
        Ok(Self { service })
    }

    pub fn service(&self) -> &Arc<DirectoryService> {
        &self.service
    }
}

impl Module for DirectoryModule {
    fn name(&self) -> &str {
        "directory"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
