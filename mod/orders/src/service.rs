//! Cutting-card lifecycle and the legacy-pool reconciler.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use shopfloor_core::{new_id, now_rfc3339, Access, AccessLevel, ListResult, ServiceError};
use shopfloor_kv::KVStore;
use shopfloor_ledger::{clean_reorder_rows, sum_by_index, CloseOrigin, LedgerService};
use shopfloor_store::{kv_err, DocStore};

use crate::model::{
    CardListQuery, ClaimRequest, CloseRequest, CreateCardRequest, Order, OrderStatus,
    StartOutcome, StartRequest, TransferRequest, UpdateCardRequest,
};
use crate::name::{card_name, material_for_index, LOCATIONS};
use crate::parse::parse_rows;

/// Canonical card collection.
pub const DB_KEY: &str = "orders_db_v1";
/// Deprecated flat pool still written by the old front end; ingest-only.
pub const LEGACY_KEY: &str = "orders_pool";
/// Signal key bumped by legacy writers after touching [`LEGACY_KEY`].
pub const BUMP_KEY: &str = "orders_pool_bump";

pub struct OrdersService {
    kv: Arc<dyn KVStore>,
    db: DocStore<Vec<Order>>,
    legacy: DocStore<Vec<Order>>,
    ledger: Arc<LedgerService>,
    access: Arc<dyn Access>,
    /// Serializes read-modify-write cycles on the card collection within
    /// this process. Cross-process writers converge via the reconciler.
    write_lock: Mutex<()>,
}

impl OrdersService {
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

    /// Get a card by id.
    pub fn get(&self, id: &str) -> Result<Order, ServiceError> {
        let list = self.db.load()?;
        list.into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("order '{}' not found", id)))
    }

    /// Unfiltered snapshot of the whole collection, newest first.
    pub fn snapshot(&self) -> Result<Vec<Order>, ServiceError> {
        self.db.load()
    }

    /// List cards, newest first, with optional status/assignee/text filters.
    pub fn list(&self, query: &CardListQuery) -> Result<ListResult<Order>, ServiceError> {
        let status = match &query.status {
            Some(s) => Some(
                OrderStatus::from_str(s)
                    .ok_or_else(|| ServiceError::Validation(format!("unknown status '{}'", s)))?,
            ),
            None => None,
        };

        let list = self.db.load()?;
        let filtered: Vec<Order> = list
            .into_iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .filter(|o| {
                query
                    .assignee
                    .as_deref()
                    .map_or(true, |a| o.assignee.as_deref() == Some(a))
            })
            .filter(|o| match &query.q {
                Some(q) => {
                    let q = q.to_lowercase();
                    o.name.to_lowercase().contains(&q)
                        || o.items.iter().any(|it| it.index.to_lowercase().contains(&q))
                }
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

    /// Publish a new cutting card into the pool.
    pub async fn create(&self, req: CreateCardRequest) -> Result<Order, ServiceError> {
        self.access.check(&req.actor, "/constructor", AccessLevel::Write)?;

        if !LOCATIONS.contains(&req.location.as_str()) {
            return Err(ServiceError::Validation(format!(
                "unknown location '{}'",
                req.location
            )));
        }
        let items = parse_rows(&req.rows);
        if items.is_empty() {
            return Err(ServiceError::Validation(
                "no usable item rows: expected one 'INDEX QTY' pair per line".into(),
            ));
        }

        let now = Utc::now();
        let material = items.first().and_then(|it| material_for_index(&it.index));
        let order = Order {
            id: new_id(),
            name: card_name(req.program, material, req.plates, &req.location, now),
            plates: req.plates,
            items,
            status: OrderStatus::Pool,
            assignee: None,
            priority: req.priority,
            board_format_id: req.board_format_id.filter(|s| !s.trim().is_empty()),
            created_at: now.to_rfc3339(),
            taken_at: None,
            started_at: None,
            closed_at: None,
            printed_at: None,
            transfer_history: Vec::new(),
        };

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        list.insert(0, order.clone());
        self.db.save(&list)?;
        info!(order = %order.id, name = %order.name, "cutting card published");
        Ok(order)
    }

    /// Claim a card from the pool. Only `pool` cards can be claimed; any
    /// other status is a conflict and the collection stays untouched.
    pub async fn claim(&self, id: &str, req: ClaimRequest) -> Result<Order, ServiceError> {
        let assignee = req.assignee.trim();
        if assignee.is_empty() {
            return Err(ServiceError::Validation("assignee must not be blank".into()));
        }
        self.access.check(assignee, "/operator", AccessLevel::Write)?;

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
        info!(order = %id, assignee, "card claimed");
        Ok(claimed)
    }

    /// Start work on a claimed card. Sets `started_at` on the first call
    /// only; `print_now` in the outcome is true exactly once per card.
    pub async fn start(&self, id: &str, req: StartRequest) -> Result<StartOutcome, ServiceError> {
        self.access.check(&req.assignee, "/operator", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        let now = now_rfc3339();
        order.status = OrderStatus::InProgress;
        if order.started_at.is_none() {
            order.started_at = Some(now.clone());
        }
        let print_now = order.printed_at.is_none();
        if print_now {
            order.printed_at = Some(now);
        }
        let started = order.clone();
        self.db.save(&list)?;
        info!(order = %id, assignee = %req.assignee, print_now, "card started");
        Ok(StartOutcome { order: started, print_now })
    }

    /// Close a card and run the stock reconciliation.
    ///
    /// AX is credited `qty_per_card × max(1, plates)` per item and debited by
    /// the cleaned reorder sums; the same debits land in the operator reorder
    /// buffer. The buffer writes and the status flip commit in one storage
    /// transaction, so a torn close cannot leave the ledger ahead of the
    /// card or the other way round.
    pub async fn close(&self, id: &str, req: CloseRequest) -> Result<Order, ServiceError> {
        self.access.check(&req.assignee, "/operator", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        let credits = order.ax_credits();
        let debits = sum_by_index(&clean_reorder_rows(&req.rows));

        order.status = OrderStatus::Done;
        order.closed_at = Some(now_rfc3339());
        let closed = order.clone();

        let mut entries = self.ledger.close_entries(CloseOrigin::Operator, &credits, &debits)?;
        entries.push(self.db.entry(&list)?);
        commit(&*self.kv, &entries)?;
        info!(order = %id, assignee = %req.assignee, "card closed");
        Ok(closed)
    }

    /// Hand a card over to another operator. Only the current holder may
    /// transfer; closed cards never move.
    pub async fn transfer(&self, id: &str, req: TransferRequest) -> Result<Order, ServiceError> {
        self.access.check(&req.assignee, "/operator", AccessLevel::Write)?;
        let to = req.to.trim();
        if to.is_empty() {
            return Err(ServiceError::Validation("transfer target must not be blank".into()));
        }

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        check_holder(order, id, &req.assignee)?;

        order.transfer_history.push(crate::model::TransferRecord {
            to: to.to_string(),
            at: now_rfc3339(),
            by: req.assignee.clone(),
        });
        order.assignee = Some(to.to_string());
        // The new holder resumes wherever the card actually is.
        order.status = if order.started_at.is_some() {
            OrderStatus::InProgress
        } else {
            OrderStatus::Taken
        };
        let transferred = order.clone();
        self.db.save(&list)?;
        info!(order = %id, from = %req.assignee, to, "card transferred");
        Ok(transferred)
    }

    /// Patch the freely-mutable card fields. An empty `boardFormatId`
    /// clears the reference; absent fields stay unchanged.
    pub async fn update(&self, id: &str, req: UpdateCardRequest) -> Result<Order, ServiceError> {
        self.access.check(&req.actor, "/operator", AccessLevel::Write)?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.load()?;
        let order = find_mut(&mut list, id)?;
        match req.board_format_id {
            None => {}
            Some(ref s) if s.trim().is_empty() => order.board_format_id = None,
            Some(s) => order.board_format_id = Some(s),
        }
        if let Some(p) = req.priority {
            order.priority = Some(p);
        }
        let updated = order.clone();
        self.db.save(&list)?;
        Ok(updated)
    }

    // ---- legacy reconciliation ----

    /// Merge entries from the deprecated flat pool into the canonical
    /// collection. Additive-only: existing cards are never overwritten or
    /// removed, new legacy entries are prepended, and the legacy source is
    /// left in place for its remaining writers. Returns how many entries
    /// were brought over; idempotent by card id.
    pub async fn merge_legacy(&self) -> Result<usize, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let legacy = self.legacy.load()?;
        if legacy.is_empty() {
            return Ok(0);
        }
        let mut list = self.db.load()?;
        let known: HashSet<&str> = list.iter().map(|o| o.id.as_str()).collect();
        let fresh: Vec<Order> = legacy
            .into_iter()
            .filter(|o| !known.contains(o.id.as_str()))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        let merged = fresh.len();
        list.splice(0..0, fresh);
        self.db.save(&list)?;
        info!(merged, "legacy pool entries merged");
        Ok(merged)
    }
}

fn find_mut<'a>(list: &'a mut [Order], id: &str) -> Result<&'a mut Order, ServiceError> {
    list.iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("order '{}' not found", id)))
}

/// Shared holder check for start/close/transfer. Checked in precedence
/// order: a closed card reports closed even to a stranger.
fn check_holder(order: &Order, id: &str, assignee: &str) -> Result<(), ServiceError> {
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
                    "order '{}' held by another operator",
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

    fn test_service() -> (OrdersService, Arc<dyn KVStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> =
            Arc::new(RedbStore::open(&dir.path().join("test.redb")).unwrap());
        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = Arc::new(LedgerService::new(Arc::clone(&kv), Arc::clone(&access)));
        let svc = OrdersService::new(Arc::clone(&kv), ledger, access);
        (svc, kv, dir)
    }

    async fn publish(svc: &OrdersService, rows: &str, plates: i64) -> Order {
        svc.create(CreateCardRequest {
            actor: "constructor".into(),
            program: 1,
            location: "W".into(),
            plates,
            rows: rows.into(),
            priority: None,
            board_format_id: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_publishes_to_pool() {
        let (svc, _kv, _dir) = test_service();
        let order = svc
            .create(CreateCardRequest {
                actor: "constructor".into(),
                program: 1,
                location: "W".into(),
                plates: 3,
                rows: "721C0015-01 4\n721C0015-01 2\n711C0018 1".into(),
                priority: Some(2),
                board_format_id: None,
            })
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pool);
        assert!(order.name.starts_with("P01_Skl15_3Pl_W_"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].qty_per_card, 6);
        assert!(order.assignee.is_none());

        let got = svc.get(&order.id).unwrap();
        assert_eq!(got.name, order.name);
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let (svc, _kv, _dir) = test_service();
        let err = svc
            .create(CreateCardRequest {
                actor: "constructor".into(),
                program: 1,
                location: "W".into(),
                plates: 1,
                rows: "   \nX 0\n".into(),
                priority: None,
                board_format_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .create(CreateCardRequest {
                actor: "constructor".into(),
                program: 1,
                location: "XX".into(),
                plates: 1,
                rows: "X 1".into(),
                priority: None,
                board_format_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn list_is_newest_first_with_filters() {
        let (svc, _kv, _dir) = test_service();
        let first = publish(&svc, "721C0015-01 1", 1).await;
        let second = publish(&svc, "711C0018-02 1", 1).await;

        let all = svc.list(&CardListQuery::default()).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, second.id);

        svc.claim(&first.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();
        let taken = svc
            .list(&CardListQuery {
                status: Some("taken".into()),
                assignee: Some("op-01".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(taken.total, 1);
        assert_eq!(taken.items[0].id, first.id);

        let err = svc
            .list(&CardListQuery { status: Some("bogus".into()), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let hit = svc
            .list(&CardListQuery { q: Some("711c0018".into()), ..Default::default() })
            .unwrap();
        assert_eq!(hit.total, 1);
        assert_eq!(hit.items[0].id, second.id);
    }

    #[tokio::test]
    async fn claim_is_first_wins() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "721C0015-01 2", 1).await;

        let claimed = svc
            .claim(&order.id, ClaimRequest { assignee: "op-01".into() })
            .await
            .unwrap();
        assert_eq!(claimed.status, OrderStatus::Taken);
        assert_eq!(claimed.assignee.as_deref(), Some("op-01"));
        assert!(claimed.taken_at.is_some());

        let err = svc
            .claim(&order.id, ClaimRequest { assignee: "op-02".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Loser left no trace: the card still belongs to the winner.
        let got = svc.get(&order.id).unwrap();
        assert_eq!(got.assignee.as_deref(), Some("op-01"));
        assert_eq!(got.status, OrderStatus::Taken);
    }

    #[tokio::test]
    async fn start_gates_printing_once() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "721C0015-01 2", 1).await;
        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();

        let first = svc
            .start(&order.id, StartRequest { assignee: "op-01".into() })
            .await
            .unwrap();
        assert!(first.print_now);
        assert_eq!(first.order.status, OrderStatus::InProgress);
        let started_at = first.order.started_at.clone().unwrap();
        assert_eq!(first.order.printed_at.as_deref(), Some(started_at.as_str()));

        let second = svc
            .start(&order.id, StartRequest { assignee: "op-01".into() })
            .await
            .unwrap();
        assert!(!second.print_now);
        assert_eq!(second.order.started_at.as_deref(), Some(started_at.as_str()));
    }

    #[tokio::test]
    async fn start_requires_the_holder() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "721C0015-01 2", 1).await;

        let err = svc
            .start(&order.id, StartRequest { assignee: "op-01".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not claimed"));

        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();
        let err = svc
            .start(&order.id, StartRequest { assignee: "op-02".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("held by another"));
    }

    #[tokio::test]
    async fn close_reconciles_stock_and_reorders() {
        let (svc, kv, _dir) = test_service();
        let order = publish(&svc, "X 1\nY 2", 8).await;
        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();

        let closed = svc
            .close(
                &order.id,
                CloseRequest {
                    assignee: "op-01".into(),
                    rows: vec![
                        shopfloor_ledger::ReorderRow { index: "X".into(), qty: 3 },
                        shopfloor_ledger::ReorderRow { index: "  ".into(), qty: 9 },
                        shopfloor_ledger::ReorderRow { index: "Z".into(), qty: 2 },
                        shopfloor_ledger::ReorderRow { index: "Y".into(), qty: 0 },
                    ],
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.status, OrderStatus::Done);
        assert!(closed.closed_at.is_some());

        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = LedgerService::new(Arc::clone(&kv), access);
        let ax = ledger.read(LedgerName::Ax).unwrap();
        assert_eq!(ax.get("X"), Some(&5)); // 1×8 credited, 3 debited
        assert_eq!(ax.get("Y"), Some(&16));
        assert_eq!(ax.get("Z"), Some(&-2)); // pure debit goes negative
        let doz = ledger.read(LedgerName::DozOperator).unwrap();
        assert_eq!(doz.get("X"), Some(&3));
        assert_eq!(doz.get("Z"), Some(&2));
        assert_eq!(doz.get("Y"), None);
    }

    #[tokio::test]
    async fn close_error_precedence() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "X 1", 1).await;

        let err = svc
            .close(&order.id, CloseRequest { assignee: "op-01".into(), rows: vec![] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not claimed"));

        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();
        let err = svc
            .close(&order.id, CloseRequest { assignee: "op-02".into(), rows: vec![] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("held by another"));

        svc.close(&order.id, CloseRequest { assignee: "op-01".into(), rows: vec![] })
            .await
            .unwrap();
        // Closed wins over wrong-holder in the error ordering.
        let err = svc
            .close(&order.id, CloseRequest { assignee: "op-02".into(), rows: vec![] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already closed"));
    }

    #[tokio::test]
    async fn transfer_records_history_and_keeps_progress() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "X 1", 1).await;
        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();

        // Taken card transfers as taken.
        let moved = svc
            .transfer(&order.id, TransferRequest { assignee: "op-01".into(), to: "op-02".into() })
            .await
            .unwrap();
        assert_eq!(moved.status, OrderStatus::Taken);
        assert_eq!(moved.assignee.as_deref(), Some("op-02"));
        assert_eq!(moved.transfer_history.len(), 1);
        assert_eq!(moved.transfer_history[0].to, "op-02");
        assert_eq!(moved.transfer_history[0].by, "op-01");

        // Started card transfers as in_progress and keeps started_at.
        svc.start(&order.id, StartRequest { assignee: "op-02".into() }).await.unwrap();
        let moved = svc
            .transfer(&order.id, TransferRequest { assignee: "op-02".into(), to: "op-03".into() })
            .await
            .unwrap();
        assert_eq!(moved.status, OrderStatus::InProgress);
        assert!(moved.started_at.is_some());
        assert_eq!(moved.transfer_history.len(), 2);

        // Old holder lost its rights with the handover.
        let err = svc
            .transfer(&order.id, TransferRequest { assignee: "op-02".into(), to: "op-04".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("held by another"));
    }

    #[tokio::test]
    async fn transfer_rejected_on_done_and_blank_target() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "X 1", 1).await;
        svc.claim(&order.id, ClaimRequest { assignee: "op-01".into() }).await.unwrap();

        let err = svc
            .transfer(&order.id, TransferRequest { assignee: "op-01".into(), to: "  ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        svc.close(&order.id, CloseRequest { assignee: "op-01".into(), rows: vec![] })
            .await
            .unwrap();
        let err = svc
            .transfer(&order.id, TransferRequest { assignee: "op-01".into(), to: "op-02".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already closed"));
    }

    #[tokio::test]
    async fn update_patches_board_format_and_priority() {
        let (svc, _kv, _dir) = test_service();
        let order = publish(&svc, "X 1", 1).await;

        let updated = svc
            .update(
                &order.id,
                UpdateCardRequest {
                    actor: "curator".into(),
                    board_format_id: Some("bf1".into()),
                    priority: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.board_format_id.as_deref(), Some("bf1"));
        assert!(updated.priority.is_none());

        // Empty string clears, absent leaves alone.
        let updated = svc
            .update(
                &order.id,
                UpdateCardRequest {
                    actor: "curator".into(),
                    board_format_id: Some("".into()),
                    priority: Some(3),
                },
            )
            .await
            .unwrap();
        assert!(updated.board_format_id.is_none());
        assert_eq!(updated.priority, Some(3));

        let updated = svc
            .update(
                &order.id,
                UpdateCardRequest { actor: "curator".into(), board_format_id: None, priority: None },
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, Some(3));
    }

    #[tokio::test]
    async fn merge_legacy_is_additive_and_idempotent() {
        let (svc, kv, _dir) = test_service();
        let ours = publish(&svc, "X 1", 1).await;

        // Legacy writer left two entries behind, one of them already known.
        let legacy = serde_json::json!([
            {
                "id": "ord_1738000000_aa11bb",
                "fileName": "P09_W18_2Pl_B_071_7.45",
                "plates": 2,
                "items": [{"index": "711C0018-01", "qtyPerCard": 4}],
                "status": "pool",
                "createdAt": "2026-02-10T07:45:00.000Z"
            },
            serde_json::to_value(&ours).unwrap(),
        ]);
        let raw = serde_json::to_vec(&legacy).unwrap();
        kv.set(LEGACY_KEY, &raw).unwrap();

        assert_eq!(svc.merge_legacy().await.unwrap(), 1);
        let all = svc.list(&CardListQuery::default()).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, "ord_1738000000_aa11bb");
        assert_eq!(all.items[0].name, "P09_W18_2Pl_B_071_7.45");

        // Second pass finds nothing new and the source stays in place.
        assert_eq!(svc.merge_legacy().await.unwrap(), 0);
        assert_eq!(kv.get(LEGACY_KEY).unwrap(), Some(raw));
    }

    #[tokio::test]
    async fn merge_legacy_with_empty_source_is_a_noop() {
        let (svc, _kv, _dir) = test_service();
        assert_eq!(svc.merge_legacy().await.unwrap(), 0);
    }
}
