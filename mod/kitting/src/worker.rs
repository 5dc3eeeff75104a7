use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::KittingService;

/// Configuration for the kitting legacy-pool reconciler.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Fallback poll interval (seconds).
    pub poll_interval: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { poll_interval: 2 }
    }
}

/// Start the reconciler that ingests the deprecated kitting pool.
///
/// Same contract as the cards reconciler: one merge at startup, one on
/// every change notification for the legacy or bump key, and a fixed-rate
/// fallback poll for writers outside this process.
pub fn start(
    service: Arc<KittingService>,
    legacy_changed: Arc<Notify>,
    bump_changed: Arc<Notify>,
    config: SyncConfig,
) -> CancellationToken {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.poll_interval);

        tokio::spawn(async move {
            info!("kitting pool reconciler started (poll={interval:?})");
            run_merge(&service).await;
            loop {
                let on_legacy = legacy_changed.notified();
                let on_bump = bump_changed.notified();
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("kitting pool reconciler stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        debug!("kitting pool poll");
                        run_merge(&service).await;
                    }
                    _ = on_legacy => {
                        debug!("kitting pool change notification");
                        run_merge(&service).await;
                    }
                    _ = on_bump => {
                        debug!("kitting pool bump notification");
                        run_merge(&service).await;
                    }
                }
            }
        });
    }

    cancel
}

async fn run_merge(service: &KittingService) {
    match service.merge_legacy().await {
        Ok(0) => {}
        Ok(n) => info!("kitting pool reconciler: merged {n} entries"),
        Err(e) => error!("kitting pool reconciler error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shopfloor_core::{Access, AllowAll};
    use shopfloor_kv::{KVStore, RedbStore, WatchedKV};
    use shopfloor_ledger::LedgerService;

    use crate::model::KitListQuery;
    use crate::service::{BUMP_KEY, LEGACY_KEY};

    #[tokio::test]
    async fn bump_key_triggers_merge() {
        let dir = tempfile::tempdir().unwrap();
        let watched = Arc::new(WatchedKV::new(Arc::new(
            RedbStore::open(&dir.path().join("test.redb")).unwrap(),
        )));
        let kv: Arc<dyn KVStore> = Arc::clone(&watched) as Arc<dyn KVStore>;
        let access: Arc<dyn Access> = Arc::new(AllowAll);
        let ledger = Arc::new(LedgerService::new(Arc::clone(&kv), Arc::clone(&access)));
        let service = Arc::new(KittingService::new(Arc::clone(&kv), ledger, access));

        let cancel = start(
            Arc::clone(&service),
            watched.watch(LEGACY_KEY),
            watched.watch(BUMP_KEY),
            SyncConfig { poll_interval: 3600 },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A legacy dispatcher fills the pool through a plain (unwatched)
        // handle and then bumps the signal key through the watched one.
        let legacy = serde_json::json!([{
            "id": "K_1738000000_bb22",
            "sdItem": "SD-310",
            "qtyPlan": 2,
            "location": "A",
            "status": "pool",
            "createdAt": "2026-03-01T08:00:00.000Z"
        }]);
        watched
            .inner()
            .set(LEGACY_KEY, &serde_json::to_vec(&legacy).unwrap())
            .unwrap();
        watched.set(BUMP_KEY, b"1").unwrap();

        let mut merged = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if service.list(&KitListQuery::default()).unwrap().total == 1 {
                merged = true;
                break;
            }
        }
        cancel.cancel();
        assert!(merged, "legacy entry should appear after the bump notification");
    }
}
