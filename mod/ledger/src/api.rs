use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use shopfloor_core::ServiceError;

use crate::model::{ClearRequest, LedgerMap, LedgerName, LedgerSnapshot};
use crate::service::LedgerService;

type SvcState = Arc<LedgerService>;

pub fn router(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/buffers/{name}", get(read_buffer))
        .route("/buffers/{name}/@snapshot", get(snapshot_buffer))
        .route("/buffers/{name}/@clear", post(clear_buffer))
        .with_state(service)
}

fn parse_name(name: &str) -> Result<LedgerName, ServiceError> {
    LedgerName::from_str(name)
        .ok_or_else(|| ServiceError::NotFound(format!("ledger buffer '{}' not found", name)))
}

// ---------------------------------------------------------------------------
// GET /buffers/:name
// ---------------------------------------------------------------------------

async fn read_buffer(
    State(service): State<SvcState>,
    Path(name): Path<String>,
) -> Result<Json<LedgerMap>, ServiceError> {
    let buf = service.read(parse_name(&name)?)?;
    Ok(Json(buf))
}

// ---------------------------------------------------------------------------
// GET /buffers/:name/@snapshot
// ---------------------------------------------------------------------------

async fn snapshot_buffer(
    State(service): State<SvcState>,
    Path(name): Path<String>,
) -> Result<Json<LedgerSnapshot>, ServiceError> {
    let snap = service.snapshot(parse_name(&name)?)?;
    Ok(Json(snap))
}

// ---------------------------------------------------------------------------
// POST /buffers/:name/@clear
// ---------------------------------------------------------------------------

async fn clear_buffer(
    State(service): State<SvcState>,
    Path(name): Path<String>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    service.clear(parse_name(&name)?, &req.actor)?;
    Ok(Json(serde_json::json!({ "cleared": name })))
}
