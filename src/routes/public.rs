use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. Only read-only browsing of the shared board and the
/// session endpoints themselves are exposed here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Liveness text, kept for the front-end's existing probe.
        .route("/", get(|| async { "WhereIsIt server is running" }))
        // GET /health
        // Load balancer check.
        .route("/health", get(|| async { "ok" }))
        // POST /jwt
        // Signs a 5h token for the posted identity and sets the `token` cookie.
        .route("/jwt", post(handlers::issue_session))
        // POST /logout
        // Clears the `token` cookie. Idempotent.
        .route("/logout", post(handlers::end_session))
        // GET /items
        // The whole board, unordered.
        .route("/items", get(handlers::get_items))
        // GET /recentItems
        // The six posts with the latest dateLost, for the home page.
        .route("/recentItems", get(handlers::get_recent_items))
}
