use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use shopfloor_core::ServiceError;

use crate::model::{BoardReport, KittingReport, OperatorsReport, Overview};
use crate::service::ReportService;

type SvcState = Arc<ReportService>;

pub fn router(service: SvcState) -> Router {
    Router::new()
        .route("/overview", get(overview))
        .route("/operators", get(operators))
        .route("/kitting", get(kitting))
        .route("/board-formats", get(board_formats))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /overview
// ---------------------------------------------------------------------------

async fn overview(State(service): State<SvcState>) -> Result<Json<Overview>, ServiceError> {
    let view = service.overview()?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// GET /operators
// ---------------------------------------------------------------------------

async fn operators(
    State(service): State<SvcState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<OperatorsReport>, ServiceError> {
    let report = service.operators(range.from.as_deref(), range.to.as_deref())?;
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// GET /kitting
// ---------------------------------------------------------------------------

async fn kitting(
    State(service): State<SvcState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<KittingReport>, ServiceError> {
    let report = service.kitting(range.from.as_deref(), range.to.as_deref())?;
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// GET /board-formats
// ---------------------------------------------------------------------------

async fn board_formats(
    State(service): State<SvcState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<BoardReport>, ServiceError> {
    let report = service.board_formats(range.from.as_deref(), range.to.as_deref())?;
    Ok(Json(report))
}
