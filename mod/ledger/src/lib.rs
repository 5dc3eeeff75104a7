pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use shopfloor_core::{Access, Module};
use shopfloor_kv::KVStore;

pub use model::{clean_reorder_rows, sum_by_index, CloseOrigin, LedgerMap, LedgerName, ReorderRow};
pub use service::LedgerService;

/// The ledger module: the AX stock buffer and the two reorder-demand
/// buffers, with the close-time reconciliation used by both order domains.
pub struct LedgerModule {
    service: Arc<LedgerService>,
}

impl LedgerModule {
    pub fn new(kv: Arc<dyn KVStore>, access: Arc<dyn Access>) -> Self {
        Self {
            service: Arc::new(LedgerService::new(kv, access)),
        }
    }

    /// The shared service, used by the order modules at close time.
    pub fn service(&self) -> &Arc<LedgerService> {
        &self.service
    }
}

impl Module for LedgerModule {
    fn name(&self) -> &str {
        "ledger"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
