use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod seed;
pub mod services;
pub mod token;
pub mod validation;

// Routers split by access level (public, teacher-only).
pub mod routes;
use routes::{public, teacher};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use password::{BcryptHasher, HasherState, PasswordHasher};
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};
pub use token::{TokenService, TokenState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::login,
        handlers::list_posts, handlers::get_post, handlers::create_post,
        handlers::update_post, handlers::delete_post,
        handlers::list_teachers, handlers::create_teacher, handlers::update_teacher,
        handlers::delete_teacher,
        handlers::list_students, handlers::create_student, handlers::update_student,
        handlers::delete_student
    ),
    components(
        schemas(
            models::Role, models::Post, models::PostInput, models::TeacherInput,
            models::StudentInput, models::TeacherProfile, models::StudentProfile,
            models::LoginRequest, models::LoginResponse, models::SessionUser,
            models::MessageResponse, error::ErrorBody, handlers::ServiceInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and session tokens"),
        (name = "posts", description = "School content"),
        (name = "teachers", description = "Teacher accounts (teachers only)"),
        (name = "students", description = "Student accounts (teachers only)")
    )
)]
pub struct ApiDoc;

/// Registers the `bearerAuth` scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single, immutable container shared across all requests. Every field is a cheap
/// `Arc` clone, and handlers pull out only what they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    pub hasher: HasherState,
    /// Session token issuer/verifier, keyed with the configured secret.
    pub tokens: TokenState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the token service from `config` and bundles it with the given store and hasher.
    pub fn new(config: AppConfig, repo: RepositoryState, hasher: HasherState) -> Self {
        let tokens = std::sync::Arc::new(TokenService::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl,
        ));
        Self {
            repo,
            hasher,
            tokens,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for HasherState {
    fn from_ref(app_state: &AppState) -> HasherState {
        app_state.hasher.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// One allowed origin from config. An origin that is not a valid header value allows
/// nothing rather than everything.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(%origin, "CORS_ORIGIN is not a valid header value; no origin allowed");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// create_router
///
/// Assembles the routing tree, applies the gates and the observability stack, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(teacher::teacher_routes(state.clone()))
        // Must follow the merges: it replaces the gated 405 fallbacks, so an unmounted
        // method is a plain 404 instead of hitting the token gate.
        .method_not_allowed_fallback(handlers::route_not_found)
        .fallback(handlers::route_not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying method, URI and the `x-request-id`, so every log
/// line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
