//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router; the debug routes are only mounted when enabled
pub fn create_router(state: Arc<AppState>, enable_debug_routes: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/tuplaus", post(play_handler));

    if enable_debug_routes {
        router = router
            .route("/api/debug/addPlayer", post(add_player_handler))
            .route(
                "/api/debug/everything",
                get(everything_handler).delete(delete_everything_handler),
            )
            .route("/api/debug/reconcile/:player_id", get(reconcile_handler));
    }

    router.with_state(state)
}
