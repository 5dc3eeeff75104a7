pub mod api;
pub mod model;
pub mod name;
pub mod parse;
pub mod service;
pub mod worker;

use std::sync::Arc;

use axum::Router;

use shopfloor_core::{Access, Module};
use shopfloor_kv::{KVStore, WatchedKV};
use shopfloor_ledger::LedgerService;

pub use model::{Order, OrderItem, OrderStatus, TransferRecord};
pub use service::OrdersService;
use worker::SyncConfig;

/// The orders module: cutting-card lifecycle.
///
/// Publishing, the claim/start/close state machine, transfers, close-time
/// stock reconciliation, and the reconciler that ingests the deprecated
/// flat pool still fed by legacy writers.
pub struct OrdersModule {
    service: Arc<OrdersService>,
    _sync_cancel: tokio_util::sync::CancellationToken,
}

impl OrdersModule {
    /// Create the orders module and start the legacy-pool reconciler.
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
        let service = Arc::new(OrdersService::new(
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

    /// The card service, shared with the reporting module.
    pub fn service(&self) -> &Arc<OrdersService> {
        &self.service
    }
}

impl Module for OrdersModule {
    fn name(&self) -> &str {
        "orders"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
