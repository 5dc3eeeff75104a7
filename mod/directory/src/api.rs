use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use shopfloor_core::{ListParams, ServiceError};

use crate::model::{
    AuthSession, BoardFormat, CreateBoardFormatRequest, CreateUserRequest, LoginRequest,
    PermMatrix, User,
};
use crate::service::DirectoryService;

type SvcState = Arc<DirectoryService>;

pub fn router(service: SvcState) -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/@login", post(login))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .route("/access", get(get_matrix).put(put_matrix))
        .route("/board-formats", post(create_board).get(list_boards))
        .route("/board-formats/{id}", patch(update_board).delete(delete_board))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct UserListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    q: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /users/@login
// ---------------------------------------------------------------------------

async fn login(
    State(service): State<SvcState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthSession>, ServiceError> {
    let session = service.login(req)?;
    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// POST /users
// ---------------------------------------------------------------------------

async fn create_user(
    State(service): State<SvcState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ServiceError> {
    let user = service.create_user(req)?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// GET /users
// ---------------------------------------------------------------------------

async fn list_users(
    State(service): State<SvcState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let params = ListParams {
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
        q: query.q,
    };
    let result = service.list_users(&params)?;
    Ok(Json(json!({
        "items": result.items,
        "total": result.total,
    })))
}

// ---------------------------------------------------------------------------
// GET /users/:id
// ---------------------------------------------------------------------------

async fn get_user(
    State(service): State<SvcState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    let user = service.get_user(&id)?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// PATCH /users/:id
// ---------------------------------------------------------------------------

async fn update_user(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<User>, ServiceError> {
    let user = service.update_user(&id, patch)?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// DELETE /users/:id
// ---------------------------------------------------------------------------

async fn delete_user(
    State(service): State<SvcState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    service.delete_user(&id)?;
    Ok(Json(json!({ "deleted": id })))
}

// ---------------------------------------------------------------------------
// GET /access
// ---------------------------------------------------------------------------

async fn get_matrix(State(service): State<SvcState>) -> Result<Json<PermMatrix>, ServiceError> {
    let matrix = service.matrix()?;
    Ok(Json(matrix))
}

// ---------------------------------------------------------------------------
// PUT /access
// ---------------------------------------------------------------------------

async fn put_matrix(
    State(service): State<SvcState>,
    Json(matrix): Json<PermMatrix>,
) -> Result<Json<PermMatrix>, ServiceError> {
    let matrix = service.put_matrix(matrix)?;
    Ok(Json(matrix))
}

// ---------------------------------------------------------------------------
// POST /board-formats
// ---------------------------------------------------------------------------

async fn create_board(
    State(service): State<SvcState>,
    Json(req): Json<CreateBoardFormatRequest>,
) -> Result<Json<BoardFormat>, ServiceError> {
    let format = service.create_board(req)?;
    Ok(Json(format))
}

// ---------------------------------------------------------------------------
// GET /board-formats
// ---------------------------------------------------------------------------

async fn list_boards(
    State(service): State<SvcState>,
) -> Result<Json<Vec<BoardFormat>>, ServiceError> {
    let boards = service.list_boards()?;
    Ok(Json(boards))
}

// ---------------------------------------------------------------------------
// PATCH /board-formats/:id
// ---------------------------------------------------------------------------

async fn update_board(
    State(service): State<SvcState>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<BoardFormat>, ServiceError> {
    let format = service.update_board(&id, patch)?;
    Ok(Json(format))
}

// ---------------------------------------------------------------------------
// DELETE /board-formats/:id
// ---------------------------------------------------------------------------

async fn delete_board(
    State(service): State<SvcState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    service.delete_board(&id)?;
    Ok(Json(json!({ "deleted": id })))
}
