use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::OrdersService;

/// Configuration for the background legacy-pool reconciler.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Fallback poll interval (seconds). Change notifications only cover
    /// writers inside this process, so the poll guarantees convergence
    /// with external legacy writers within this interval.
    pub poll_interval: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { poll_interval: 2 }
    }
}

/// Start the legacy-pool reconciler loop.
///
/// Runs one merge immediately, then again whenever the legacy key or its
/// bump signal key changes, and on a fixed fallback interval. Merging is
/// additive and idempotent, so overlapping triggers are harmless.
///
/// Returns a CancellationToken that stops the worker when cancelled.
pub fn start(
    service: Arc<OrdersService>,
    legacy_changed: Arc<Notify>,
    bump_changed: Arc<Notify>,
    config: SyncConfig,
) -> CancellationToken {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.poll_interval);

        tokio::spawn(async move {
            info!("legacy pool reconciler started (poll={interval:?})");
            run_merge(&service).await;
            loop {
                // Arm the notifications before sleeping so a write between
                // iterations is not lost.
                let on_legacy = legacy_changed.notified();
                let on_bump = bump_changed.notified();
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("legacy pool reconciler stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        debug!("legacy pool poll");
                        run_merge(&service).await;
                    }
                    _ = on_legacy => {
                        debug!("legacy pool change notification");
                        run_merge(&service).await;
                    }
                    _ = on_bump => {
                        debug!("legacy pool bump notification");
                        run_merge(&service).await;
                    }
                }
            }
        });
    }

    cancel
}

async fn run_merge(service: &OrdersService) {
    match service.merge_legacy().await {
        Ok(0) => {}
        Ok(n) => info!("legacy pool reconciler: merged {n} entries"),
        Err(e) => error!("legacy pool reconciler error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use shopfloor_core::{Access, AllowAll};
    use shopfloor_kv::{KVStore, RedbStore, WatchedKV};
    use shopfloor_ledger::LedgerService;

    use crate::model::CardListQuery;
    use crate::service::LEGACY_KEY;

    #[tokio::test]
    async fn notification_triggers_merge() {
        let dir = tempfile::tempdir().unwrap();
        let watched = Arc::new(WatchedKV::new(Arc::new(
            RedbStore::open(&dir.path().join("test.redb")).unwrap(),
        )));
        let kv: Arc<dyn KVStore> = Arc::clone(&watched) as Arc<dyn KVStore>;
        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = Arc::new(LedgerService::new(Arc::clone(&kv), Arc::clone(&access)));
        let service = Arc::new(OrdersService::new(Arc::clone(&kv), ledger, access));

        // Long poll interval: only the notification can trigger the merge
        // within the test window.
        let cancel = start(
            Arc::clone(&service),
            watched.watch(LEGACY_KEY),
            watched.watch(crate::service::BUMP_KEY),
            SyncConfig { poll_interval: 3600 },
        );

        // Let the startup merge of the empty pool pass.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let legacy = serde_json::json!([{
            "id": "ord_1738000000_cc33dd",
            "fileName": "P04_Skl12_1Pl_S_081_9.10",
            "plates": 1,
            "items": [{"index": "721C0012-02", "qtyPerCard": 3}],
            "status": "pool",
            "createdAt": "2026-02-20T09:10:00.000Z"
        }]);
        watched
            .set(LEGACY_KEY, &serde_json::to_vec(&legacy).unwrap())
            .unwrap();

        let mut merged = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if service.list(&CardListQuery::default()).unwrap().total == 1 {
                merged = true;
                break;
            }
        }
        cancel.cancel();
        assert!(merged, "legacy entry should appear after the change notification");
    }
}
