use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use shopfloor_core::ServiceError;
use shopfloor_orders::model::{ClaimRequest, StartRequest, TransferRequest};

use crate::model::{KitCloseRequest, KitListQuery, KittingOrder, PublishRequest};
use crate::service::KittingService;

type SvcState = Arc<KittingService>;

pub fn router(service: Arc<KittingService>) -> Router {
    Router::new()
        .route("/orders", post(publish_orders).get(list_orders))
        .route("/orders/@sync", post(sync_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/@claim", post(claim_order))
        .route("/orders/{id}/@start", post(start_order))
        .route("/orders/{id}/@close", post(close_order))
        .route("/orders/{id}/@transfer", post(transfer_order))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// POST /orders
// ---------------------------------------------------------------------------

async fn publish_orders(
    State(service): State<SvcState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let created = service.publish(req).await?;
    let count = created.len();
    Ok(Json(serde_json::json!({
        "created": created,
        "count": count,
    })))
}

// ---------------------------------------------------------------------------
// GET /orders
// ---------------------------------------------------------------------------

async fn list_orders(
    State(service): State<SvcState>,
    Query(query): Query<KitListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = service.list(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

// ---------------------------------------------------------------------------
// POST /orders/@sync
// ---------------------------------------------------------------------------

async fn sync_orders(
    State(service): State<SvcState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let merged = service.merge_legacy().await?;
    Ok(Json(serde_json::json!({ "merged": merged })))
}

// ---------------------------------------------------------------------------
// GET /orders/:id
// ---------------------------------------------------------------------------

async fn get_order(
    State(service): State<SvcState>,
    Path(id): Path<String>,
) -> Result<Json<KittingOrder>, ServiceError> {
    let order = service.get(&id)?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /orders/:id/@claim
// ---------------------------------------------------------------------------

async fn claim_order(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<KittingOrder>, ServiceError> {
    let order = service.claim(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /orders/:id/@start
// ---------------------------------------------------------------------------

async fn start_order(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<StartRequest>,
) -> Result<Json<KittingOrder>, ServiceError> {
    let order = service.start(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /orders/:id/@close
// ---------------------------------------------------------------------------

async fn close_order(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<KitCloseRequest>,
) -> Result<Json<KittingOrder>, ServiceError> {
    let order = service.close(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /orders/:id/@transfer
// ---------------------------------------------------------------------------

async fn transfer_order(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<KittingOrder>, ServiceError> {
    let order = service.transfer(&id, req).await?;
    Ok(Json(order))
}
