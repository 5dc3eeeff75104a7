pub mod api;
pub mod model;
pub mod service;
pub mod worker;

use std::sync::Arc;

use axum::Router;

use shopfloor_core::{Access, Module};
use shopfloor_kv::{KVStore, WatchedKV};
use shopfloor_ledger::LedgerService;

pub use model::KittingOrder;
pub use service::KittingService;
use worker::SyncConfig;

/// The kitting module: sub-order lifecycle.
///
/// Bulk publishing of catalog models, the same claim/start/close state
/// machine as cutting cards, reorder demand into the kitting buffer, and
/// the reconciler for the deprecated kitting pool.
pub struct KittingModule {
    service: Arc<KittingService>,
    _sync_cancel: tokio_util::sync::CancellationToken,
}

impl KittingModule {
    /// Create the kitting module and start its legacy-pool reconciler.
    pub fn new(kv: Arc<WatchedKV>, ledger: Arc<LedgerService>, access: Arc<dyn Access>) -> Self {
        Self::with_config(kv, ledger, access, SyncConfig::default())
    }

    /// Create with explicit reconciler configuration.
    pub fn with_config(
        kv: Arc<WatchedKV>,
        ledger: Arc<LedgerService>,
        access: Arc<dyn Access>,
        sync_config: SyncConfig,
    ) -> Self {
        let legacy_changed = kv.watch(service::LEGACY_KEY);
        let bump_changed = kv.watch(service::BUMP_KEY);
        let service = Arc::new(KittingService::new(
            Arc::clone(&kv) as Arc<dyn KVStore>,
            ledger,
            access,
        ));
        let cancel = worker::start(
            Arc::clone(&service),
            legacy_changed,
            bump_changed,
            sync_config,
        );

        Self {
            service,
            _sync_cancel: cancel,
        }
    }

    /// The sub-order service, shared with the reporting module.
    pub fn service(&self) -> &Arc<KittingService> {
        &self.service
    }
}

impl Module for KittingModule {
    fn name(&self) -> &str {
        "kitting"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
