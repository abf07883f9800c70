//! Router construction.

use axum::Router;
use axum::routing::any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the application router.
///
/// Every resource shares one dispatching handler; verb-to-action mapping
/// and method override happen inside it so unsupported verbs can answer
/// 405 with an `Allow` list.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{resource}", any(handlers::handle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
