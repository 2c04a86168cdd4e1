use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints available without signing in. The listing still looks for an
/// admin identity so it can render the admin link, but never requires one.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /posts
        // Every post, plus the optional admin identity.
        .route("/posts", get(handlers::list_posts))
        // GET /posts/{slug}
        // A single post. "/posts/admin" is a static route and wins over this one.
        .route("/posts/{slug}", get(handlers::get_post))
}
