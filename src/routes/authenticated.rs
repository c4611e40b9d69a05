use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the Access Guard, so handlers always receive a verified
/// `AuthUser`. Ownership (item `contactEmail` == session email) is then checked per
/// handler for the routes that mutate an existing item.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /items
        // Posts a new item owned by the session subject.
        .route("/items", post(handlers::create_item))
        // GET /items/{id}
        // Detail view of one item.
        // PATCH /items/{id}
        // Owner-only partial update.
        // POST /items/{id}
        // The recovery transition.
        .route(
            "/items/{id}",
            get(handlers::get_item_details)
                .patch(handlers::update_item)
                .post(handlers::recover_item),
        )
        // GET /myItems
        // Items owned by the session subject.
        .route("/myItems", get(handlers::get_my_items))
        // DELETE /myItems/{id}
        // Owner-only delete.
        .route("/myItems/{id}", delete(handlers::delete_my_item))
        // GET /recoveredItems
        // Recovery records made by the session subject.
        .route("/recoveredItems", get(handlers::get_recovered_items))
}
