//! Route registration: collects all module routes plus system endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use shopfloor_core::Module;

/// Build the complete router. Each module's routes are nested under
/// `/{module_name}`; modules carry their own state.
pub fn build_router(modules: &[&dyn Module]) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for module in modules {
        app = app.nest(&format!("/{}", module.name()), module.routes());
    }

    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "shopfloord",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
