//! Kitting sub-order lifecycle and its legacy-pool reconciler.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use shopfloor_core::{new_id, now_rfc3339, Access, AccessLevel, ListResult, ServiceError};
use shopfloor_kv::KVStore;
use shopfloor_ledger::{clean_reorder_rows, sum_by_index, CloseOrigin, LedgerMap, LedgerService};
use shopfloor_orders::{OrderStatus, TransferRecord};
use shopfloor_store::{kv_err, DocStore};

use crate::model::{
    parse_bulk, KitCloseRequest, KitListQuery, KittingOrder, PublishRequest, LOCATIONS,
};
use shopfloor_orders::model::{ClaimRequest, StartRequest, TransferRequest};

/// Canonical sub-order collection.
pub const DB_KEY: &str = "kitting_db_v1";
/// Deprecated flat pool still written by old dispatch tooling; ingest-only.
pub const LEGACY_KEY: &str = "kitting_pool";
/// Signal key bumped by legacy writers after touching [`LEGACY_KEY`].
pub const BUMP_KEY: &str = "kitting_pool_bump";

pub struct KittingService {
    kv: Arc<dyn KVStore>,
    db: DocStore<Vec<KittingOrder>>,
    legacy: DocStore<Vec<KittingOrder>>,
    ledger: Arc<LedgerService>,
    access: Arc<dyn Access>,
    write_lock: Mutex<()>,
}

impl KittingService {
    pub fn new(kv: Arc<dyn KVStore>, ledger: Arc<LedgerService>, access: Arc<dyn Access>) -> Self {
        Self {
            db: DocStore::new(Arc::clone(&kv), DB_KEY),
            legacy: DocStore::new(Arc::clone(&kv), LEGACY_KEY),
            kv,
            ledger,
            access,
            write_lock: Mutex::new(()),
        }
    }

    // ---- queries ----

    pub fn get(&self, id: &str) -> Result<KittingOrder, ServiceError> {
        let list = self.db.load()?;
        list.into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("order '{}' not found", id)))
    }

    /// Unfiltered snapshot of the whole collection, newest first.
    pub fn snapshot(&self) -> Result<Vec<KittingOrder>, ServiceError> {
        self.db.load()
    }

    /// List sub-orders, newest first, with optional filters.
    pub fn list(&self, query: &KitListQuery) -> Result<ListResult<KittingOrder>, ServiceError> {
        let status = match &query.status {
            Some(s) => Some(
                OrderStatus::from_str(s)
                    .ok_or_else(|| ServiceError::Validation(format!("unknown status '{}'", s)))?,
            ),
            None => None,
        };

        let list = self.db.load()?;
        let filtered: Vec<KittingOrder> = list
            .into_iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .filter(|o| {
                query
                    .assignee
                    .as_deref()
                    .map_or(true, |a| o.assignee.as_deref() == Some(a))
            })
            .filter(|o| query.location.as_deref().map_or(true, |l| o.location == l))
            .filter(|o| match &query.q {
                Some(q) => o.sd_item.to_lowercase().contains(&q.to_lowercase()),
                None => true,
            })
            .collect();

        let total = filtered.len();
        let items = filtered
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(50))
            .collect();
        Ok(ListResult { items, total })
    }

    // ---- lifecycle ----

    /// Publish a batch of sub-orders into the pool. The whole batch shares
    /// one creation timestamp and lands at the head of the collection in
    /// catalog order.
    pub async fn publish(&self, req: PublishRequest) -> Result<Vec<KittingOrder>, ServiceError> {
        self.access.check(&req.actor, "/kitting", AccessLevel::Write)?;

        if !LOCATIONS.contains(&req.location.as_str()) {
            return Err(ServiceError::Validation(format!(
                "unknown location '{}'",
                req.location
            )));
        }
        let rows = parse_bulk(&req.rows);
        if rows.is_empty() {
            return Err(ServiceError::Validation(
                "no usable rows: expected one 'MODEL QTY' pair per line".into(),
            ));
        }

        let now = now_rfc3339();
        let created: Vec<KittingOrder> = rows
            .into_iter()
            .map(|r| KittingOrder {
                id: new_id(),
                sd_item: r.sd_item,
                qty_plan: r.qty_plan,
                location: req.location.clone(),
                status: OrderStatus::Pool,
                assignee: None,
                priority: req.priority,
                created_at: now.clone(),
                taken_at: None,
                started_at: None,
                closed_at: None,
                transfer_history: Vec::new(),
            })
            .collect();

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        list.splice(0..0, created.iter().cloned());
        self.db.save(&list)?;
        info!(count = created.len(), location = %req.location, "kitting batch published");
        Ok(created)
    }

    /// Claim a sub-order from the pool. First claim wins; anything else is
    /// a conflict and the collection stays untouched.
    pub async fn claim(&self, id: &str, req: ClaimRequest) -> Result<KittingOrder, ServiceError> {
        let assignee = req.assignee.trim();
        if assignee.is_empty() {
            return Err(ServiceError::Validation("assignee must not be blank".into()));
        }
        self.access.check(assignee, "/kitting", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        if order.status != OrderStatus::Pool {
            return Err(ServiceError::Conflict(format!("order '{}' already claimed", id)));
        }
        order.status = OrderStatus::Taken;
        order.assignee = Some(assignee.to_string());
        order.taken_at = Some(now_rfc3339());
        let claimed = order.clone();
        self.db.save(&list)?;
        info!(order = %id, assignee, "kitting order claimed");
        Ok(claimed)
    }

    /// Start work; `started_at` is set on the first call only. Sub-orders
    /// have no print gate.
    pub async fn start(&self, id: &str, req: StartRequest) -> Result<KittingOrder, ServiceError> {
        self.access.check(&req.assignee, "/kitting", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        order.status = OrderStatus::InProgress;
        if order.started_at.is_none() {
            order.started_at = Some(now_rfc3339());
        }
        let started = order.clone();
        self.db.save(&list)?;
        info!(order = %id, assignee = %req.assignee, "kitting order started");
        Ok(started)
    }

    /// Close a sub-order. Kitting closes only append reorder demand into
    /// the kitting buffer; the AX stock buffer is never touched from here.
    /// The buffer write and the status flip commit together.
    pub async fn close(&self, id: &str, req: KitCloseRequest) -> Result<KittingOrder, ServiceError> {
        self.access.check(&req.assignee, "/kitting", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        let debits = sum_by_index(&clean_reorder_rows(&req.rows));

        order.status = OrderStatus::Done;
        order.closed_at = Some(now_rfc3339());
        let closed = order.clone();

        let mut entries =
            self.ledger
                .close_entries(CloseOrigin::Kitting, &LedgerMap::new(), &debits)?;
        entries.push(self.db.entry(&list)?);
        commit(&*self.kv, &entries)?;
        info!(order = %id, assignee = %req.assignee, "kitting order closed");
        Ok(closed)
    }

    /// Hand a sub-order over to another kitter.
    pub async fn transfer(
        &self,
        id: &str,
        req: TransferRequest,
    ) -> Result<KittingOrder, ServiceError> {
        self.access.check(&req.assignee, "/kitting", AccessLevel::Write)?;
        let to = req.to.trim();
        if to.is_empty() {
            return Err(ServiceError::Validation("transfer target must not be blank".into()));
        }

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        order.transfer_history.push(TransferRecord {
            to: to.to_string(),
            at: now_rfc3339(),
            by: req.assignee.clone(),
        });
        order.assignee = Some(to.to_string());
        order.status = if order.started_at.is_some() {
            OrderStatus::InProgress
        } else {
            OrderStatus::Taken
        };
        let transferred = order.clone();
        self.db.save(&list)?;
        info!(order = %id, from = %req.assignee, to, "kitting order transferred");
        Ok(transferred)
    }

    // ---- legacy reconciliation ----

    /// Merge entries from the deprecated flat pool, additive-only and
    /// idempotent by id. The legacy source is left in place.
    pub async fn merge_legacy(&self) -> Result<usize, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let legacy = self.legacy.load()?;
        if legacy.is_empty() {
            return Ok(0);
        }
        let mut list = self.db.load()?;
        let known: HashSet<&str> = list.iter().map(|o| o.id.as_str()).collect();
        let fresh: Vec<KittingOrder> = legacy
            .into_iter()
            .filter(|o| !known.contains(o.id.as_str()))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        let merged = fresh.len();
        list.splice(0..0, fresh);
        self.db.save(&list)?;
        info!(merged, "legacy kitting pool entries merged");
        Ok(merged)
    }
}

fn find_mut<'a>(list: &'a mut [KittingOrder], id: &str) -> Result<&'a mut KittingOrder, ServiceError> {
    list.iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("order '{}' not found", id)))
}

fn check_holder(order: &KittingOrder, id: &str, assignee: &str) -> Result<(), ServiceError> {
    match order.status {
        OrderStatus::Done => {
            Err(ServiceError::Conflict(format!("order '{}' already closed", id)))
        }
        OrderStatus::Pool => Err(ServiceError::Conflict(format!("order '{}' not claimed", id))),
        OrderStatus::Taken | OrderStatus::InProgress => {
            if order.assignee.as_deref() == Some(assignee) {
                Ok(())
            } else {
                Err(ServiceError::Conflict(format!(
                    "order '{}' held by another kitter",
                    id
                )))
            }
        }
    }
}

fn commit(kv: &dyn KVStore, entries: &[(&'static str, Vec<u8>)]) -> Result<(), ServiceError> {
    let refs: Vec<(&str, &[u8])> = entries.iter().map(|(k, v)| (*k, v.as_slice())).collect();
    kv.batch_set(&refs).map_err(kv_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfloor_core::AllowAll;
    use shopfloor_kv::RedbStore;
    use shopfloor_ledger::LedgerName;

    fn test_service() -> (KittingService, Arc<dyn KVStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> =
            Arc::new(RedbStore::open(&dir.path().join("test.redb")).unwrap());
        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = Arc::new(LedgerService::new(Arc::clone(&kv), Arc::clone(&access)));
        let svc = KittingService::new(Arc::clone(&kv), ledger, access);
        (svc, kv, dir)
    }

    async fn publish_batch(svc: &KittingService, rows: &str) -> Vec<KittingOrder> {
        svc.publish(PublishRequest {
            actor: "master".into(),
            location: "W".into(),
            rows: rows.into(),
            priority: Some(0),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn publish_creates_a_sorted_batch_with_one_timestamp() {
        let (svc, _kv, _dir) = test_service();
        let created = publish_batch(&svc, "SD-200 4\nSD-100 2\nSD-200 1").await;

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].sd_item, "SD-100");
        assert_eq!(created[1].sd_item, "SD-200");
        assert_eq!(created[1].qty_plan, 5);
        assert_eq!(created[0].created_at, created[1].created_at);
        assert!(created.iter().all(|o| o.status == OrderStatus::Pool));

        // The batch lands at the head of the collection in batch order.
        publish_batch(&svc, "SD-900 1").await;
        let all = svc.list(&KitListQuery::default()).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].sd_item, "SD-900");
        assert_eq!(all.items[1].sd_item, "SD-100");
    }

    #[tokio::test]
    async fn publish_rejects_empty_and_unknown_location() {
        let (svc, _kv, _dir) = test_service();
        let err = svc
            .publish(PublishRequest {
                actor: "master".into(),
                location: "W".into(),
                rows: "  \n ".into(),
                priority: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // "D" is a cutting-card location but not a kitting one.
        let err = svc
            .publish(PublishRequest {
                actor: "master".into(),
                location: "D".into(),
                rows: "SD-100 1".into(),
                priority: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn lifecycle_mirrors_the_card_state_machine() {
        let (svc, _kv, _dir) = test_service();
        let created = publish_batch(&svc, "SD-100 2").await;
        let id = created[0].id.clone();

        let claimed = svc
            .claim(&id, ClaimRequest { assignee: "kitt-01".into() })
            .await
            .unwrap();
        assert_eq!(claimed.status, OrderStatus::Taken);

        let err = svc
            .claim(&id, ClaimRequest { assignee: "kitt-02".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let started = svc
            .start(&id, StartRequest { assignee: "kitt-01".into() })
            .await
            .unwrap();
        assert_eq!(started.status, OrderStatus::InProgress);
        let started_at = started.started_at.clone();

        let again = svc
            .start(&id, StartRequest { assignee: "kitt-01".into() })
            .await
            .unwrap();
        assert_eq!(again.started_at, started_at);

        let closed = svc
            .close(&id, KitCloseRequest { assignee: "kitt-01".into(), rows: vec![] })
            .await
            .unwrap();
        assert_eq!(closed.status, OrderStatus::Done);

        let err = svc
            .start(&id, StartRequest { assignee: "kitt-01".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already closed"));
    }

    #[tokio::test]
    async fn close_touches_only_the_kitting_buffer() {
        let (svc, kv, _dir) = test_service();
        let created = publish_batch(&svc, "SD-100 2").await;
        let id = created[0].id.clone();
        svc.claim(&id, ClaimRequest { assignee: "kitt-01".into() }).await.unwrap();

        svc.close(
            &id,
            KitCloseRequest {
                assignee: "kitt-01".into(),
                rows: vec![
                    shopfloor_ledger::ReorderRow { index: "721C0015-01".into(), qty: 4 },
                    shopfloor_ledger::ReorderRow { index: "".into(), qty: 7 },
                ],
            },
        )
        .await
        .unwrap();

        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = LedgerService::new(Arc::clone(&kv), access);
        let doz = ledger.read(LedgerName::DozKitting).unwrap();
        assert_eq!(doz.get("721C0015-01"), Some(&4));
        // Closing a sub-order never produces stock.
        assert!(ledger.read(LedgerName::Ax).unwrap().is_empty());
        assert!(ledger.read(LedgerName::DozOperator).unwrap().is_empty());
    }

    #[tokio::test]
    async fn transfer_hands_over_and_records_history() {
        let (svc, _kv, _dir) = test_service();
        let created = publish_batch(&svc, "SD-100 2").await;
        let id = created[0].id.clone();
        svc.claim(&id, ClaimRequest { assignee: "kitt-01".into() }).await.unwrap();

        let moved = svc
            .transfer(&id, TransferRequest { assignee: "kitt-01".into(), to: "kitt-02".into() })
            .await
            .unwrap();
        assert_eq!(moved.assignee.as_deref(), Some("kitt-02"));
        assert_eq!(moved.status, OrderStatus::Taken);
        assert_eq!(moved.transfer_history.len(), 1);
        assert_eq!(moved.transfer_history[0].by, "kitt-01");
    }

    #[tokio::test]
    async fn list_filters_by_location() {
        let (svc, _kv, _dir) = test_service();
        publish_batch(&svc, "SD-100 1").await;
        svc.publish(PublishRequest {
            actor: "master".into(),
            location: "P".into(),
            rows: "SD-200 1".into(),
            priority: None,
        })
        .await
        .unwrap();

        let at_p = svc
            .list(&KitListQuery { location: Some("P".into()), ..Default::default() })
            .unwrap();
        assert_eq!(at_p.total, 1);
        assert_eq!(at_p.items[0].sd_item, "SD-200");
    }

    #[tokio::test]
    async fn merge_legacy_dedupes_by_id() {
        let (svc, kv, _dir) = test_service();
        let legacy = serde_json::json!([
            {
                "id": "K_1738000000_aa11",
                "sdItem": "SD-300",
                "qtyPlan": 3,
                "location": "S",
                "status": "pool",
                "createdAt": "2026-02-12T10:00:00.000Z"
            }
        ]);
        kv.set(LEGACY_KEY, &serde_json::to_vec(&legacy).unwrap()).unwrap();

        assert_eq!(svc.merge_legacy().await.unwrap(), 1);
        assert_eq!(svc.merge_legacy().await.unwrap(), 0);
        let all = svc.list(&KitListQuery::default()).unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.items[0].sd_item, "SD-300");
    }
}
