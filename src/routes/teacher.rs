use crate::{
    AppState,
    auth::{authenticate, require_teacher},
    handlers,
};
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

/// Teacher Router Module
///
/// Every write route plus the account listings. Two gates wrap the whole router:
/// `authenticate` runs first (401 on a missing or bad token) and attaches the identity,
/// then `require_teacher` checks it (403 unless the role is exactly `teacher`).
/// Neither gate touches the data store. Methods that are not mounted on a path fall
/// through to the 404 handler registered in `create_router`.
pub fn teacher_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // --- Posts (writes) ---
        .route("/api/posts", post(handlers::create_post))
        .route(
            "/api/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        // --- Teachers ---
        .route(
            "/api/teachers",
            get(handlers::list_teachers).post(handlers::create_teacher),
        )
        .route(
            "/api/teachers/{id}",
            patch(handlers::update_teacher).delete(handlers::delete_teacher),
        )
        // --- Students ---
        .route(
            "/api/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        // PUT and PATCH are both partial updates.
        .route(
            "/api/students/{id}",
            patch(handlers::update_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        // Layers run bottom-up: authenticate, then the role check.
        .route_layer(middleware::from_fn(require_teacher))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}
