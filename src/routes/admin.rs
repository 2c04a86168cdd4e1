use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// The post editor. `create_router` wraps this router in the admin guard middleware, and
/// each handler also takes `AdminUser` so it knows who is acting.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /posts/admin
        // Admin listing; the landing page after every successful write.
        .route("/posts/admin", get(handlers::admin_index))
        // GET/POST /posts/admin/{slug}
        // Load the editor ("new" for a blank form) and handle its create/update/delete
        // submissions.
        .route(
            "/posts/admin/{slug}",
            get(handlers::get_admin_post).post(handlers::save_post),
        )
}
