//! `shopfloord`, the shop-floor order tracking server.
//!
//! Usage:
//!   shopfloord [--data-dir <dir>] [--db <path>] [--listen <addr>]
//!
//! One embedded store backs every module; the directory module seeds the
//! administrator account and default permissions on first run.

mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use shopfloor_core::{Access, Module, ServiceConfig};
use shopfloor_directory::{DirectoryModule, MatrixAccess};
use shopfloor_kitting::KittingModule;
use shopfloor_kv::{KVStore, RedbStore, WatchedKV};
use shopfloor_ledger::LedgerModule;
use shopfloor_orders::OrdersModule;
use shopfloor_report::ReportModule;

/// Shop-floor order tracking server.
#[derive(Parser, Debug)]
#[command(name = "shopfloord", about = "Shop-floor order tracking server", version)]
struct Cli {
    /// Base directory for persistent data.
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Database file path (overrides `{data-dir}/data.redb`).
    #[arg(long = "db")]
    db: Option<PathBuf>,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig {
        data_dir: cli.data_dir,
        db_path: cli.db,
        listen: cli.listen,
    };

    if let Some(dir) = &config.data_dir {
        std::fs::create_dir_all(dir)?;
    }

    // One embedded store, shared by all modules. The watch wrapper carries
    // the change signals the legacy-pool reconcilers subscribe to.
    let db_path = config.resolve_db_path();
    let store: Arc<dyn KVStore> = Arc::new(
        RedbStore::open(&db_path)
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let kv = Arc::new(WatchedKV::new(store));
    info!("store opened at {}", db_path.display());

    // Directory first: it seeds first-run data and answers the permission
    // checks every other module runs.
    let directory_module = DirectoryModule::new(Arc::clone(&kv) as Arc<dyn KVStore>)?;
    let access: Arc<dyn Access> = Arc::new(MatrixAccess::new(Arc::clone(
        directory_module.service(),
    )));
    info!("directory module initialized");

    let ledger_module = LedgerModule::new(Arc::clone(&kv) as Arc<dyn KVStore>, Arc::clone(&access));
    info!("ledger module initialized");

    let orders_module = OrdersModule::new(
        Arc::clone(&kv),
        Arc::clone(ledger_module.service()),
        Arc::clone(&access),
    );
    info!("orders module initialized");

    let kitting_module = KittingModule::new(
        Arc::clone(&kv),
        Arc::clone(ledger_module.service()),
        Arc::clone(&access),
    );
    info!("kitting module initialized");

    let report_module = ReportModule::new(
        Arc::clone(orders_module.service()),
        Arc::clone(kitting_module.service()),
        Arc::clone(ledger_module.service()),
        Arc::clone(directory_module.service()),
    );
    info!("report module initialized");

    let modules: Vec<&dyn Module> = vec![
        &directory_module,
        &ledger_module,
        &orders_module,
        &kitting_module,
        &report_module,
    ];
    let app = routes::build_router(&modules);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("shopfloord listening on {}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
