use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: the banner, health check, login and the
/// read side of posts.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        // Load balancer health check.
        .route("/health", get(|| async { "ok" }))
        .route("/api/auth/login", post(handlers::login))
        // GET /api/posts?page=&limit=&author=&subject=
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/{id}", get(handlers::get_post))
}
