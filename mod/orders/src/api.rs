use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use shopfloor_core::ServiceError;

use crate::model::{
    CardListQuery, ClaimRequest, CloseRequest, CreateCardRequest, Order, StartOutcome,
    StartRequest, TransferRequest, UpdateCardRequest,
};
use crate::service::OrdersService;

type SvcState = Arc<OrdersService>;

pub fn router(service: Arc<OrdersService>) -> Router {
    Router::new()
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/@sync", post(sync_cards))
        .route("/cards/{id}", get(get_card).patch(update_card))
        .route("/cards/{id}/@claim", post(claim_card))
        .route("/cards/{id}/@start", post(start_card))
        .route("/cards/{id}/@close", post(close_card))
        .route("/cards/{id}/@transfer", post(transfer_card))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// POST /cards
// ---------------------------------------------------------------------------

async fn create_card(
    State(service): State<SvcState>,
    Json(req): Json<CreateCardRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.create(req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// GET /cards
// ---------------------------------------------------------------------------

async fn list_cards(
    State(service): State<SvcState>,
    Query(query): Query<CardListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = service.list(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

// ---------------------------------------------------------------------------
// POST /cards/@sync
// ---------------------------------------------------------------------------

async fn sync_cards(
    State(service): State<SvcState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let merged = service.merge_legacy().await?;
    Ok(Json(serde_json::json!({ "merged": merged })))
}

// ---------------------------------------------------------------------------
// GET /cards/:id
// ---------------------------------------------------------------------------

async fn get_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.get(&id)?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// PATCH /cards/:id
// ---------------------------------------------------------------------------

async fn update_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.update(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /cards/:id/@claim
// ---------------------------------------------------------------------------

async fn claim_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.claim(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /cards/:id/@start
// ---------------------------------------------------------------------------

async fn start_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartOutcome>, ServiceError> {
    let outcome = service.start(&id, req).await?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// POST /cards/:id/@close
// ---------------------------------------------------------------------------

async fn close_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.close(&id, req).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// POST /cards/:id/@transfer
// ---------------------------------------------------------------------------

async fn transfer_card(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = service.transfer(&id, req).await?;
    Ok(Json(order))
}
