use std::sync::Arc;

use shopfloor_core::ServiceError;
use shopfloor_directory::DirectoryService;
use shopfloor_kitting::KittingService;
use shopfloor_ledger::{LedgerName, LedgerService};
use shopfloor_orders::OrdersService;

use crate::model::{
    board_report, kitting_report, operators_report, overview, BoardReport, KittingReport,
    OperatorsReport, Overview, ReportRange,
};

/// Read-only aggregation facade over the other modules' collections.
pub struct ReportService {
    orders: Arc<OrdersService>,
    kitting: Arc<KittingService>,
    ledger: Arc<LedgerService>,
    directory: Arc<DirectoryService>,
}

impl ReportService {
    pub fn new(
        orders: Arc<OrdersService>,
        kitting: Arc<KittingService>,
        ledger: Arc<LedgerService>,
        directory: Arc<DirectoryService>,
    ) -> Self {
        Self { orders, kitting, ledger, directory }
    }

    pub fn overview(&self) -> Result<Overview, ServiceError> {
        let orders = self.orders.snapshot()?;
        let kits = self.kitting.snapshot()?;
        let ax = self.ledger.read(LedgerName::Ax)?;
        let doz_kitting = self.ledger.read(LedgerName::DozKitting)?;
        Ok(overview(&orders, &kits, &ax, &doz_kitting))
    }

    pub fn operators(&self, from: Option<&str>, to: Option<&str>) -> Result<OperatorsReport, ServiceError> {
        let range = ReportRange::parse(from, to)?;
        Ok(operators_report(&self.orders.snapshot()?, &range))
    }

    pub fn kitting(&self, from: Option<&str>, to: Option<&str>) -> Result<KittingReport, ServiceError> {
        let range = ReportRange::parse(from, to)?;
        Ok(kitting_report(&self.kitting.snapshot()?, &range))
    }

    pub fn board_formats(&self, from: Option<&str>, to: Option<&str>) -> Result<BoardReport, ServiceError> {
        let range = ReportRange::parse(from, to)?;
        let boards = self.directory.list_boards()?;
        Ok(board_report(&self.orders.snapshot()?, &boards, &range))
    }
}
