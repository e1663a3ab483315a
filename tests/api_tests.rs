use chrono::{NaiveDate, Utc};
use school_portal::{
    AppConfig, AppState, BcryptHasher, HasherState, InMemoryRepository, PasswordHasher,
    TokenService, create_router,
    models::{Student, Teacher},
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub config: AppConfig,
}

/// Serves the full router on a random local port, backed by the in-memory store and
/// holding one teacher ("joao@professor.com") and one student ("maria@aluna.com"), both
/// with password "senha123".
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let hasher = BcryptHasher::with_cost(4);
    let hash = hasher.hash("senha123").await.unwrap();
    let now = Utc::now();

    repo.create_teacher(Teacher {
        id: "teacher123".into(),
        name: "Professor João".into(),
        email: "joao@professor.com".into(),
        national_id: "12345678901".into(),
        registration: "PROF001".into(),
        password_hash: hash.clone(),
        subject: "Matemática".into(),
        phone: "(11) 98765-4321".into(),
        birth_date: NaiveDate::from_ymd_opt(1980, 5, 15).unwrap(),
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();

    repo.create_student(Student {
        id: "student456".into(),
        name: "Maria Aluna".into(),
        email: "maria@aluna.com".into(),
        national_id: "55566677788".into(),
        registration: "ALU001".into(),
        password_hash: hash,
        class_group: "3A".into(),
        phone: "(11) 91234-5678".into(),
        birth_date: NaiveDate::from_ymd_opt(2005, 3, 20).unwrap(),
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();

    let config = AppConfig::default();
    let state = AppState::new(
        config.clone(),
        repo.clone() as RepositoryState,
        Arc::new(hasher) as HasherState,
    );
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        config,
    }
}

async fn login(app: &TestApp, email: &str, senha: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": email, "senha": senha }))
        .send()
        .await
        .expect("req fail")
}

async fn token_for(app: &TestApp, email: &str) -> String {
    let body: Value = login(app, email, "senha123").await.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_root_banner_lists_routes() {
    let app = spawn_app().await;
    let body: Value = reqwest::get(format!("{}/", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        body["routes"]
            .as_array()
            .unwrap()
            .contains(&json!("/api/posts"))
    );
}

#[tokio::test]
async fn test_teacher_login_returns_token_and_user() {
    let app = spawn_app().await;
    let response = login(&app, "joao@professor.com", "senha123").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["user"],
        json!({
            "id": "teacher123",
            "nome": "Professor João",
            "email": "joao@professor.com",
            "role": "teacher"
        })
    );

    // The token decodes back to the same identity under the configured secret.
    let tokens = TokenService::new(app.config.jwt_secret.as_bytes(), app.config.token_ttl);
    let identity = tokens.verify(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(identity.id, "teacher123");
    assert_eq!(identity.email, "joao@professor.com");
    assert_eq!(identity.role, "teacher");
}

#[tokio::test]
async fn test_student_login_has_student_role() {
    let app = spawn_app().await;
    let body: Value = login(&app, "maria@aluna.com", "senha123")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["id"], "student456");
}

#[tokio::test]
async fn test_bad_password_and_unknown_email_look_identical() {
    let app = spawn_app().await;

    let wrong = login(&app, "joao@professor.com", "errada").await;
    assert_eq!(wrong.status(), 400);
    let wrong: Value = wrong.json().await.unwrap();

    let unknown = login(&app, "ninguem@escola.com", "senha123").await;
    assert_eq!(unknown.status(), 400);
    let unknown: Value = unknown.json().await.unwrap();

    assert_eq!(wrong, json!({ "message": "invalid credentials" }));
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_malformed_login_reports_fields() {
    let app = spawn_app().await;
    let response = login(&app, "not-an-email", "").await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "invalid data");
    assert_eq!(body["errors"]["email"], json!(["invalid email"]));
    assert_eq!(body["errors"]["senha"], json!(["required"]));
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(&app, "joao@professor.com").await;

    // Nothing published yet.
    let empty = client
        .get(format!("{}/api/posts", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 204);

    let created = client
        .post(format!("{}/api/posts", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Frações",
            "content": "Somando frações com denominadores diferentes.",
            "author": "Professor João",
            "subject": "Matemática"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let post: Value = created.json().await.unwrap();
    let id = post["id"].as_str().unwrap().to_string();

    // Public read with an exact-match filter.
    let listed: Value = client
        .get(format!("{}/api/posts?subject=Matemática", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let patched = client
        .patch(format!("{}/api/posts/{}", app.address, id))
        .bearer_auth(&token)
        .json(&json!({ "title": "Frações II" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patched.status(), 200);
    let patched: Value = patched.json().await.unwrap();
    assert_eq!(patched["title"], "Frações II");
    assert_eq!(patched["subject"], "Matemática");

    let empty_patch = client
        .patch(format!("{}/api/posts/{}", app.address, id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_patch.status(), 400);
    let body: Value = empty_patch.json().await.unwrap();
    assert_eq!(body["message"], "no data sent for update");

    let deleted = client
        .delete(format!("{}/api/posts/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let body: Value = deleted.json().await.unwrap();
    assert_eq!(body["message"], "deleted successfully");

    let gone = client
        .get(format!("{}/api/posts/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 204);

    let again = client
        .delete(format!("{}/api/posts/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 400);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["message"], "post not found or invalid id");
}

#[tokio::test]
async fn test_student_cannot_write() {
    let app = spawn_app().await;
    let token = token_for(&app, "maria@aluna.com").await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/posts", app.address))
        .bearer_auth(&token)
        .json(&json!({ "title": "x", "content": "y", "author": "z", "subject": "w" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "access denied: teachers only" }));

    // The gate rejects before the handler, so nothing was stored.
    assert_eq!(app.repo.count_posts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_student_accounts_managed_by_teacher() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(&app, "joao@professor.com").await;

    let created = client
        .post(format!("{}/api/students", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "nome": "Pedro Souza",
            "cpf": "44455566677",
            "nascimento": "2006-07-15",
            "telefone": "(11) 92345-6789",
            "turma": "2B",
            "email": "pedro.souza@escola.com",
            "matricula": "ALU002",
            "senha": "senha123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let student: Value = created.json().await.unwrap();
    assert!(student.get("senha").is_none());
    assert!(student.get("password_hash").is_none());
    let id = student["id"].as_str().unwrap().to_string();

    // The new account can log in with the password it was created with.
    let body: Value = login(&app, "pedro.souza@escola.com", "senha123")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["user"]["role"], "student");

    // PUT is a partial update too.
    let updated: Value = client
        .put(format!("{}/api/students/{}", app.address, id))
        .bearer_auth(&token)
        .json(&json!({ "turma": "3B" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["turma"], "3B");
    assert_eq!(updated["nome"], "Pedro Souza");

    let duplicate = client
        .post(format!("{}/api/students", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "nome": "Outro Pedro",
            "cpf": "99988877766",
            "nascimento": "2006-07-15",
            "telefone": "(11) 92345-0000",
            "turma": "2B",
            "email": "pedro.souza@escola.com",
            "matricula": "ALU099",
            "senha": "senha123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["message"], "email already registered");

    let listed: Value = client
        .get(format!("{}/api/students?turma=3B", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_teacher_password_change_is_rehashed() {
    let app = spawn_app().await;
    let token = token_for(&app, "joao@professor.com").await;

    let response = reqwest::Client::new()
        .patch(format!("{}/api/teachers/teacher123", app.address))
        .bearer_auth(&token)
        .json(&json!({ "senha": "novaSenha1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let stored = app
        .repo
        .find_teacher_by_email("joao@professor.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, "novaSenha1");
    assert_eq!(login(&app, "joao@professor.com", "novaSenha1").await.status(), 200);
    assert_eq!(login(&app, "joao@professor.com", "senha123").await.status(), 400);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/api/nothing-here", app.address))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "route not found" }));
}
