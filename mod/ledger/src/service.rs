//! Ledger buffer operations.

use std::sync::Arc;

use tracing::info;

use shopfloor_core::{Access, AccessLevel, ServiceError};
use shopfloor_kv::KVStore;
use shopfloor_store::DocStore;

use crate::model::{
    merge_into, snapshot_rows, CloseOrigin, LedgerMap, LedgerName, LedgerSnapshot,
};

pub struct LedgerService {
    ax: DocStore<LedgerMap>,
    doz_operator: DocStore<LedgerMap>,
    doz_kitting: DocStore<LedgerMap>,
    access: Arc<dyn Access>,
}

impl LedgerService {
    pub fn new(kv: Arc<dyn KVStore>, access: Arc<dyn Access>) -> Self {
        Self {
            ax: DocStore::new(Arc::clone(&kv), LedgerName::Ax.storage_key()),
            doz_operator: DocStore::new(Arc::clone(&kv), LedgerName::DozOperator.storage_key()),
            doz_kitting: DocStore::new(kv, LedgerName::DozKitting.storage_key()),
            access,
        }
    }

    fn doc(&self, name: LedgerName) -> &DocStore<LedgerMap> {
        match name {
            LedgerName::Ax => &self.ax,
            LedgerName::DozOperator => &self.doz_operator,
            LedgerName::DozKitting => &self.doz_kitting,
        }
    }

    /// Load a buffer raw, negatives included.
    pub fn read(&self, name: LedgerName) -> Result<LedgerMap, ServiceError> {
        self.doc(name).load()
    }

    /// Positive rows sorted by index, plus their total. Never mutates:
    /// export is an explicit two-step, snapshot then clear.
    pub fn snapshot(&self, name: LedgerName) -> Result<LedgerSnapshot, ServiceError> {
        let buf = self.doc(name).load()?;
        let rows = snapshot_rows(&buf);
        let total = rows.iter().map(|r| r.qty).sum();
        Ok(LedgerSnapshot { rows, total })
    }

    /// Clear a buffer; the next read is empty. The AX buffer belongs to the
    /// stock view, the reorder buffers to the constructor's view.
    pub fn clear(&self, name: LedgerName, actor: &str) -> Result<(), ServiceError> {
        let path = match name {
            LedgerName::Ax => "/ax",
            LedgerName::DozOperator | LedgerName::DozKitting => "/constructor",
        };
        self.access.check(actor, path, AccessLevel::Write)?;
        self.doc(name).clear()?;
        info!(ledger = name.as_str(), actor, "ledger buffer cleared");
        Ok(())
    }

    /// Run the close-time reconciliation and serialize the touched buffers
    /// for the caller's batch commit, so the buffer writes land in the same
    /// storage transaction as the order's status flip.
    ///
    /// Operator closes credit AX per item, debit AX by the cleaned reorder
    /// sums, and append the same debits into the operator reorder buffer,
    /// independent of the AX write. Kitting closes only append into the
    /// kitting reorder buffer. AX may go negative: more was scrapped or
    /// needed than produced.
    pub fn close_entries(
        &self,
        origin: CloseOrigin,
        credits: &LedgerMap,
        debits: &LedgerMap,
    ) -> Result<Vec<(&'static str, Vec<u8>)>, ServiceError> {
        match origin {
            CloseOrigin::Operator => {
                let mut ax = self.ax.load()?;
                merge_into(&mut ax, credits, 1);
                merge_into(&mut ax, debits, -1);

                let mut doz = self.doz_operator.load()?;
                merge_into(&mut doz, debits, 1);

                Ok(vec![self.ax.entry(&ax)?, self.doz_operator.entry(&doz)?])
            }
            CloseOrigin::Kitting => {
                let mut doz = self.doz_kitting.load()?;
                merge_into(&mut doz, debits, 1);
                Ok(vec![self.doz_kitting.entry(&doz)?])
            }
        }
    }
}
