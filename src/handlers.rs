use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        LoginRequest, LoginResponse, MessageResponse, Post, PostInput, PostQuery, StudentInput,
        StudentProfile, StudentQuery, TeacherInput, TeacherProfile, TeacherQuery,
    },
    services::{self, Outcome},
    validation::{PostUpdate, StudentUpdate, TeacherUpdate, Valid},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use utoipa::ToSchema;

/// ServiceInfo
///
/// Banner returned by `GET /`, listing the main entry points.
#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub message: String,
    pub routes: Vec<String>,
    pub docs: String,
}

/// root
///
/// [Public Route] Liveness banner.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "API running".into(),
        routes: ["/api/auth/login", "/api/posts", "/api/teachers", "/api/students"]
            .map(String::from)
            .to_vec(),
        docs: "/swagger-ui".into(),
    })
}

// --- Authentication ---

/// login
///
/// [Public Route] Exchanges `{email, senha}` for a bearer token. Teacher accounts are
/// matched before student accounts. Unknown email and wrong password share one response.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Invalid data or invalid credentials", body = ErrorBody),
        (status = 500, description = "Store fault", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Valid(credentials): Valid<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = services::auth::login(
        state.repo.as_ref(),
        state.hasher.as_ref(),
        &state.tokens,
        credentials,
    )
    .await?;
    Ok(Json(response))
}

// --- Posts ---

/// list_posts
///
/// [Public Route] Paginated post listing with optional exact-match filters.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "Posts", body = [Post]),
        (status = 204, description = "No posts match")
    ),
    tag = "posts"
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Outcome<Vec<Post>>, ApiError> {
    let (filter, page) = query.into_parts();
    services::posts::list(state.repo.as_ref(), filter, page).await
}

/// get_post
///
/// [Public Route] A single post. An unknown id answers 204 with no body.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 204, description = "No post with this id")
    ),
    tag = "posts"
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Outcome<Post>, ApiError> {
    services::posts::get(state.repo.as_ref(), &id).await
}

/// create_post
///
/// [Teacher Route]
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not a teacher", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "posts"
)]
pub async fn create_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Valid(form): Valid<PostInput>,
) -> Result<Outcome<Post>, ApiError> {
    tracing::debug!(actor = %actor.id, "creating post");
    services::posts::create(state.repo.as_ref(), form).await
}

/// update_post
///
/// [Teacher Route] Partial update; absent fields are left untouched.
#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body = PostInput,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Empty update, invalid data or unknown id", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "posts"
)]
pub async fn update_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Valid(changes): Valid<PostUpdate>,
) -> Result<Outcome<Post>, ApiError> {
    tracing::debug!(actor = %actor.id, post_id = %id, "updating post");
    services::posts::update(state.repo.as_ref(), &id, changes).await
}

/// delete_post
///
/// [Teacher Route]
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Unknown id", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "posts"
)]
pub async fn delete_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Outcome<MessageResponse>, ApiError> {
    tracing::info!(actor = %actor.id, post_id = %id, "deleting post");
    services::posts::delete(state.repo.as_ref(), &id).await
}

// --- Teachers ---

/// list_teachers
///
/// [Teacher Route] Password hashes are never part of the response.
#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherQuery),
    responses(
        (status = 200, description = "Teachers", body = [TeacherProfile]),
        (status = 204, description = "No teachers match")
    ),
    security(("bearerAuth" = [])),
    tag = "teachers"
)]
pub async fn list_teachers(
    State(state): State<AppState>,
    Query(query): Query<TeacherQuery>,
) -> Result<Outcome<Vec<TeacherProfile>>, ApiError> {
    let (filter, page) = query.into_parts();
    services::teachers::list(state.repo.as_ref(), filter, page).await
}

/// create_teacher
///
/// [Teacher Route]
#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = TeacherInput,
    responses(
        (status = 201, description = "Created", body = TeacherProfile),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 409, description = "Email, cpf or matricula already registered", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "teachers"
)]
pub async fn create_teacher(
    actor: AuthUser,
    State(state): State<AppState>,
    Valid(form): Valid<TeacherInput>,
) -> Result<Outcome<TeacherProfile>, ApiError> {
    tracing::debug!(actor = %actor.id, "creating teacher");
    services::teachers::create(state.repo.as_ref(), state.hasher.as_ref(), form).await
}

/// update_teacher
///
/// [Teacher Route]
#[utoipa::path(
    patch,
    path = "/api/teachers/{id}",
    params(("id" = String, Path, description = "Teacher id")),
    request_body = TeacherInput,
    responses(
        (status = 200, description = "Updated", body = TeacherProfile),
        (status = 400, description = "Empty update, invalid data or unknown id", body = ErrorBody),
        (status = 409, description = "Unique field collision", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "teachers"
)]
pub async fn update_teacher(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Valid(patch): Valid<TeacherUpdate>,
) -> Result<Outcome<TeacherProfile>, ApiError> {
    tracing::debug!(actor = %actor.id, teacher_id = %id, "updating teacher");
    services::teachers::update(state.repo.as_ref(), state.hasher.as_ref(), &id, patch).await
}

/// delete_teacher
///
/// [Teacher Route]
#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    params(("id" = String, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Unknown id", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "teachers"
)]
pub async fn delete_teacher(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Outcome<MessageResponse>, ApiError> {
    tracing::info!(actor = %actor.id, teacher_id = %id, "deleting teacher");
    services::teachers::delete(state.repo.as_ref(), &id).await
}

// --- Students ---

/// list_students
///
/// [Teacher Route] Same filters and paging as the teacher listing.
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Students", body = [StudentProfile]),
        (status = 204, description = "No students match")
    ),
    security(("bearerAuth" = [])),
    tag = "students"
)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Outcome<Vec<StudentProfile>>, ApiError> {
    let (filter, page) = query.into_parts();
    services::students::list(state.repo.as_ref(), filter, page).await
}

/// create_student
///
/// [Teacher Route]
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentInput,
    responses(
        (status = 201, description = "Created", body = StudentProfile),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 409, description = "Email, cpf or matricula already registered", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "students"
)]
pub async fn create_student(
    actor: AuthUser,
    State(state): State<AppState>,
    Valid(form): Valid<StudentInput>,
) -> Result<Outcome<StudentProfile>, ApiError> {
    tracing::debug!(actor = %actor.id, "creating student");
    services::students::create(state.repo.as_ref(), state.hasher.as_ref(), form).await
}

/// update_student
///
/// [Teacher Route] Mounted on both PUT and PATCH; both are partial.
#[utoipa::path(
    patch,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    request_body = StudentInput,
    responses(
        (status = 200, description = "Updated", body = StudentProfile),
        (status = 400, description = "Empty update, invalid data or unknown id", body = ErrorBody),
        (status = 409, description = "Unique field collision", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "students"
)]
pub async fn update_student(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Valid(patch): Valid<StudentUpdate>,
) -> Result<Outcome<StudentProfile>, ApiError> {
    tracing::debug!(actor = %actor.id, student_id = %id, "updating student");
    services::students::update(state.repo.as_ref(), state.hasher.as_ref(), &id, patch).await
}

/// delete_student
///
/// [Teacher Route]
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Unknown id", body = ErrorBody)
    ),
    security(("bearerAuth" = [])),
    tag = "students"
)]
pub async fn delete_student(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Outcome<MessageResponse>, ApiError> {
    tracing::info!(actor = %actor.id, student_id = %id, "deleting student");
    services::students::delete(state.repo.as_ref(), &id).await
}

/// route_not_found
///
/// Fallback for every path no router claims.
pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
