use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
    routing::get,
};
use chrono::Utc;
use school_portal::{
    AppConfig, AppState, BcryptHasher, InMemoryRepository, TokenService, TokenState,
    auth::{AuthUser, authenticate, require_teacher},
    create_router,
};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

// --- Helpers ---

fn token_service() -> TokenState {
    let config = AppConfig::default();
    Arc::new(TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl))
}

fn token_for(role: &str) -> String {
    token_service()
        .issue(&AuthUser {
            id: "u1".into(),
            email: "u1@escola.com".into(),
            role: role.into(),
        })
        .unwrap()
}

/// A bare router holding only the two gates in front of a handler that counts calls.
fn gated_router(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/protected",
            get(move |Extension(user): Extension<AuthUser>| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    user.id
                }
            }),
        )
        .route_layer(middleware::from_fn(require_teacher))
        .route_layer(middleware::from_fn_with_state(token_service(), authenticate))
}

fn app(repo: InMemoryRepository) -> Router {
    create_router(AppState::new(
        AppConfig::default(),
        Arc::new(repo),
        Arc::new(BcryptHasher::with_cost(4)),
    ))
}

fn request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Gate Tests ---

#[tokio::test]
async fn test_missing_header_is_401_token_not_provided() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = gated_router(calls.clone())
        .oneshot(request("GET", "/protected", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "token not provided");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_header_counts_as_missing() {
    let calls = Arc::new(AtomicUsize::new(0));
    for value in ["", "   "] {
        let response = gated_router(calls.clone())
            .oneshot(request("GET", "/protected", Some(value)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value:?}");
        assert_eq!(json_body(response).await["message"], "token not provided");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_garbage_token_is_401_invalid_token() {
    let calls = Arc::new(AtomicUsize::new(0));
    for value in ["Bearer garbage", "Basic dXNlcjpwYXNz", "Bearer"] {
        let response = gated_router(calls.clone())
            .oneshot(request("GET", "/protected", Some(value)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(json_body(response).await["message"], "invalid token");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let tokens = token_service();
    let issued_long_ago = Utc::now().timestamp() - 30 * 24 * 60 * 60;
    let token = tokens
        .issue_at(
            &AuthUser {
                id: "u1".into(),
                email: "u1@escola.com".into(),
                role: "teacher".into(),
            },
            issued_long_ago,
        )
        .unwrap();

    let response = gated_router(Arc::new(AtomicUsize::new(0)))
        .oneshot(request("GET", "/protected", Some(&format!("Bearer {token}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_teacher_token_reaches_handler_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let auth = format!("bearer {}", token_for("teacher"));

    let response = gated_router(calls.clone())
        .oneshot(request("GET", "/protected", Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"u1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_teacher_roles_are_403() {
    for role in ["student", "Teacher", "admin", ""] {
        let calls = Arc::new(AtomicUsize::new(0));
        let auth = format!("Bearer {}", token_for(role));

        let response = gated_router(calls.clone())
            .oneshot(request("GET", "/protected", Some(&auth)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {role:?}");
        assert_eq!(
            json_body(response).await["message"],
            "access denied: teachers only"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

// --- Full Router Tests ---

#[tokio::test]
async fn test_every_write_route_is_gated() {
    let routes = [
        ("POST", "/api/posts"),
        ("PATCH", "/api/posts/p1"),
        ("DELETE", "/api/posts/p1"),
        ("GET", "/api/teachers"),
        ("POST", "/api/teachers"),
        ("PATCH", "/api/teachers/t1"),
        ("DELETE", "/api/teachers/t1"),
        ("GET", "/api/students"),
        ("POST", "/api/students"),
        ("PUT", "/api/students/s1"),
        ("PATCH", "/api/students/s1"),
        ("DELETE", "/api/students/s1"),
    ];
    let student = format!("Bearer {}", token_for("student"));

    for (method, uri) in routes {
        let anonymous = app(InMemoryRepository::new())
            .oneshot(request(method, uri, None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

        let forbidden = app(InMemoryRepository::new())
            .oneshot(request(method, uri, Some(&student)))
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_public_reads_need_no_token() {
    let listing = app(InMemoryRepository::new())
        .oneshot(request("GET", "/api/posts", None))
        .await
        .unwrap();
    assert_eq!(listing.status(), StatusCode::NO_CONTENT);

    let single = app(InMemoryRepository::new())
        .oneshot(request("GET", "/api/posts/missing", None))
        .await
        .unwrap();
    assert_eq!(single.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unmounted_method_is_404_not_a_gate_rejection() {
    let teacher = format!("Bearer {}", token_for("teacher"));
    let cases = [
        ("PUT", "/api/posts/p1"),
        ("PUT", "/api/posts"),
        ("DELETE", "/api/teachers"),
        ("POST", "/api/students/s1"),
    ];

    for (method, uri) in cases {
        for auth in [None, Some(teacher.as_str())] {
            let response = app(InMemoryRepository::new())
                .oneshot(request(method, uri, auth))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(json_body(response).await["message"], "route not found");
        }
    }
}

#[tokio::test]
async fn test_empty_teacher_listing_is_204() {
    let auth = format!("Bearer {}", token_for("teacher"));
    let response = app(InMemoryRepository::new())
        .oneshot(request("GET", "/api/teachers", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_store_outage_is_500_on_login() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"joao@professor.com","senha":"senha123"}"#))
        .unwrap();

    let response = app(InMemoryRepository::unavailable())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["message"], "internal server error");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = app(InMemoryRepository::new())
        .oneshot(request("GET", "/health", None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
