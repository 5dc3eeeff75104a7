//! Aggregate reporting module: dashboard counters and per-assignee and
//! per-board-format breakdowns over closed orders, served under `/report`.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use shopfloor_core::Module;
use shopfloor_directory::DirectoryService;
use shopfloor_kitting::KittingService;
use shopfloor_ledger::LedgerService;
use shopfloor_orders::OrdersService;

pub use model::{BoardReport, KittingReport, OperatorsReport, Overview, ReportRange};
pub use service::ReportService;

pub struct ReportModule {
    service: Arc<ReportService>,
}

impl ReportModule {
    pub fn new(
        orders: Arc<OrdersService>,
        kitting: Arc<KittingService>,
        ledger: Arc<LedgerService>,
        directory: Arc<DirectoryService>,
    ) -> Self {
        let service = Arc::new(ReportService::new(orders, kitting, ledger, directory));
        Self { service }
    }

    pub fn service(&self) -> &Arc<ReportService> {
        &self.service
    }
}

impl Module for ReportModule {
    fn name(&self) -> &str {
        "report"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
