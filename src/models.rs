use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Roles & Principals ---

/// Role
///
/// The RBAC tag carried by every session token. Serialized lowercase (`teacher` | `student`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Used in access-denied messages ("teachers only").
    pub fn plural(&self) -> &'static str {
        match self {
            Role::Teacher => "teachers only",
            Role::Student => "students only",
        }
    }
}

/// Teacher
///
/// Canonical teacher record as stored in the `teachers` table. Holds the bcrypt hash,
/// so it is never serialized directly; responses go through `TeacherProfile`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    // Unique within the teachers table.
    pub email: String,
    pub national_id: String,
    pub registration: String,
    pub password_hash: String,
    pub subject: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student
///
/// Canonical student record (`students` table). Same shape as `Teacher`, with a class
/// group instead of a subject.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub registration: String,
    pub password_hash: String,
    pub class_group: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Principal
///
/// An authenticable identity, tagged by kind. Login resolves exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Teacher(Teacher),
    Student(Student),
}

impl Principal {
    pub fn id(&self) -> &str {
        match self {
            Principal::Teacher(t) => &t.id,
            Principal::Student(s) => &s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Principal::Teacher(t) => &t.name,
            Principal::Student(s) => &s.name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Teacher(t) => &t.email,
            Principal::Student(s) => &s.email,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Principal::Teacher(t) => &t.password_hash,
            Principal::Student(s) => &s.password_hash,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Teacher(_) => Role::Teacher,
            Principal::Student(_) => Role::Student,
        }
    }
}

/// Post
///
/// A piece of school content (`posts` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub subject: String,
}

/// Generates a fresh opaque identifier for a new record.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// --- Output Schemas ---

/// TeacherProfile
///
/// Public view of a teacher. The password hash is not part of this type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeacherProfile {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "cpf")]
    pub national_id: String,
    #[serde(rename = "matricula")]
    pub registration: String,
    #[serde(rename = "disciplina")]
    pub subject: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "nascimento")]
    pub birth_date: NaiveDate,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Teacher> for TeacherProfile {
    fn from(t: Teacher) -> Self {
        Self {
            id: t.id,
            name: t.name,
            email: t.email,
            national_id: t.national_id,
            registration: t.registration,
            subject: t.subject,
            phone: t.phone,
            birth_date: t.birth_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// StudentProfile
///
/// Public view of a student.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentProfile {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "cpf")]
    pub national_id: String,
    #[serde(rename = "matricula")]
    pub registration: String,
    #[serde(rename = "turma")]
    pub class_group: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "nascimento")]
    pub birth_date: NaiveDate,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Student> for StudentProfile {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            national_id: s.national_id,
            registration: s.registration,
            class_group: s.class_group,
            phone: s.phone,
            birth_date: s.birth_date,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// SessionUser
///
/// The identity summary returned alongside a token on login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// LoginResponse
///
/// Output of POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token. Clients must not parse it.
    pub token: String,
    pub user: SessionUser,
}

/// MessageResponse
///
/// Plain acknowledgement body, e.g. after a delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Request Payloads (Input Schemas) ---
//
// Every field is optional at the serde level so that missing and malformed fields both
// surface as per-field validation messages instead of a generic deserialization failure.

/// LoginRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[schema(example = "joao.silva@escola.com")]
    pub email: Option<String>,
    #[schema(example = "senha123")]
    pub senha: Option<String>,
}

/// PostInput
///
/// Payload for POST /api/posts and PATCH /api/posts/{id}.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// TeacherInput
///
/// Payload for POST /api/teachers and PATCH /api/teachers/{id}.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TeacherInput {
    pub nome: Option<String>,
    pub cpf: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    #[schema(example = "1980-05-15")]
    pub nascimento: Option<String>,
    pub telefone: Option<String>,
    pub disciplina: Option<String>,
    pub email: Option<String>,
    pub matricula: Option<String>,
    pub senha: Option<String>,
}

/// StudentInput
///
/// Payload for POST /api/students and PUT/PATCH /api/students/{id}.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct StudentInput {
    pub nome: Option<String>,
    pub cpf: Option<String>,
    #[schema(example = "2005-03-20")]
    pub nascimento: Option<String>,
    pub telefone: Option<String>,
    pub turma: Option<String>,
    pub email: Option<String>,
    pub matricula: Option<String>,
    pub senha: Option<String>,
}

// --- Validated Forms ---

// Stands in for plaintext passwords in `Debug` output.
const REDACTED: &str = "<redacted>";

/// Credentials
///
/// A validated login attempt. Never persisted; `Debug` hides the secret.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// PostForm
///
/// A validated new post.
#[derive(Debug, Clone)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub author: String,
    pub subject: String,
}

impl PostForm {
    pub fn into_record(self) -> Post {
        Post {
            id: new_id(),
            title: self.title,
            content: self.content,
            author: self.author,
            subject: self.subject,
        }
    }
}

/// PostChanges
///
/// Partial update for a post; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.author.is_none()
            && self.subject.is_none()
    }
}

/// TeacherForm
///
/// A validated new teacher, still carrying the plaintext password until the service
/// hashes it in `into_record`.
#[derive(Clone)]
pub struct TeacherForm {
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub registration: String,
    pub subject: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub password: String,
}

impl std::fmt::Debug for TeacherForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeacherForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("national_id", &self.national_id)
            .field("registration", &self.registration)
            .field("subject", &self.subject)
            .field("phone", &self.phone)
            .field("birth_date", &self.birth_date)
            .field("password", &REDACTED)
            .finish()
    }
}

impl TeacherForm {
    pub fn into_record(self, password_hash: String) -> Teacher {
        let now = Utc::now();
        Teacher {
            id: new_id(),
            name: self.name,
            email: self.email,
            national_id: self.national_id,
            registration: self.registration,
            password_hash,
            subject: self.subject,
            phone: self.phone,
            birth_date: self.birth_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// TeacherPatch
///
/// A validated partial update for a teacher. The plaintext password, if any, is hashed
/// by the service before becoming `TeacherChanges`.
#[derive(Clone, Default)]
pub struct TeacherPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub registration: Option<String>,
    pub subject: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password: Option<String>,
}

impl std::fmt::Debug for TeacherPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeacherPatch")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("national_id", &self.national_id)
            .field("registration", &self.registration)
            .field("subject", &self.subject)
            .field("phone", &self.phone)
            .field("birth_date", &self.birth_date)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl TeacherPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.national_id.is_none()
            && self.registration.is_none()
            && self.subject.is_none()
            && self.phone.is_none()
            && self.birth_date.is_none()
            && self.password.is_none()
    }

    pub fn into_changes(self, password_hash: Option<String>) -> TeacherChanges {
        TeacherChanges {
            name: self.name,
            email: self.email,
            national_id: self.national_id,
            registration: self.registration,
            subject: self.subject,
            phone: self.phone,
            birth_date: self.birth_date,
            password_hash,
        }
    }
}

/// TeacherChanges
///
/// What the repository applies on a teacher update (COALESCE semantics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub registration: Option<String>,
    pub subject: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password_hash: Option<String>,
}

/// StudentForm
#[derive(Clone)]
pub struct StudentForm {
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub registration: String,
    pub class_group: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub password: String,
}

impl std::fmt::Debug for StudentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("national_id", &self.national_id)
            .field("registration", &self.registration)
            .field("class_group", &self.class_group)
            .field("phone", &self.phone)
            .field("birth_date", &self.birth_date)
            .field("password", &REDACTED)
            .finish()
    }
}

impl StudentForm {
    pub fn into_record(self, password_hash: String) -> Student {
        let now = Utc::now();
        Student {
            id: new_id(),
            name: self.name,
            email: self.email,
            national_id: self.national_id,
            registration: self.registration,
            password_hash,
            class_group: self.class_group,
            phone: self.phone,
            birth_date: self.birth_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// StudentPatch
#[derive(Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub registration: Option<String>,
    pub class_group: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password: Option<String>,
}

impl std::fmt::Debug for StudentPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentPatch")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("national_id", &self.national_id)
            .field("registration", &self.registration)
            .field("class_group", &self.class_group)
            .field("phone", &self.phone)
            .field("birth_date", &self.birth_date)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.national_id.is_none()
            && self.registration.is_none()
            && self.class_group.is_none()
            && self.phone.is_none()
            && self.birth_date.is_none()
            && self.password.is_none()
    }

    pub fn into_changes(self, password_hash: Option<String>) -> StudentChanges {
        StudentChanges {
            name: self.name,
            email: self.email,
            national_id: self.national_id,
            registration: self.registration,
            class_group: self.class_group,
            phone: self.phone,
            birth_date: self.birth_date,
            password_hash,
        }
    }
}

/// StudentChanges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub registration: Option<String>,
    pub class_group: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password_hash: Option<String>,
}

// --- Listing: Filters & Pagination ---

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Pagination
///
/// 1-based page and page size. Unparsable or non-positive values fall back to the
/// defaults; `limit` is capped at `MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: u32| {
            raw.and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v >= 1)
                .unwrap_or(default)
        };
        Self {
            page: parse(page, DEFAULT_PAGE),
            limit: parse(limit, DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// PostFilter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// TeacherFilter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub registration: Option<String>,
    pub subject: Option<String>,
}

/// StudentFilter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub registration: Option<String>,
    pub class_group: Option<String>,
}

// Empty query values (`?author=`) are treated as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// PostQuery
///
/// Query parameters for GET /api/posts.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PostQuery {
    /// Page number (default 1).
    pub page: Option<String>,
    /// Page size (default 10, max 100).
    pub limit: Option<String>,
    /// Exact author match.
    pub author: Option<String>,
    /// Exact subject match.
    pub subject: Option<String>,
}

impl PostQuery {
    pub fn into_parts(self) -> (PostFilter, Pagination) {
        let pagination = Pagination::from_query(self.page.as_deref(), self.limit.as_deref());
        let filter = PostFilter {
            author: present(self.author),
            subject: present(self.subject),
        };
        (filter, pagination)
    }
}

/// TeacherQuery
///
/// Query parameters for GET /api/teachers.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TeacherQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub nome: Option<String>,
    pub email: Option<String>,
    pub matricula: Option<String>,
    pub disciplina: Option<String>,
}

impl TeacherQuery {
    pub fn into_parts(self) -> (TeacherFilter, Pagination) {
        let pagination = Pagination::from_query(self.page.as_deref(), self.limit.as_deref());
        let filter = TeacherFilter {
            name: present(self.nome),
            email: present(self.email),
            registration: present(self.matricula),
            subject: present(self.disciplina),
        };
        (filter, pagination)
    }
}

/// StudentQuery
///
/// Query parameters for GET /api/students.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StudentQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub nome: Option<String>,
    pub email: Option<String>,
    pub matricula: Option<String>,
    pub turma: Option<String>,
}

impl StudentQuery {
    pub fn into_parts(self) -> (StudentFilter, Pagination) {
        let pagination = Pagination::from_query(self.page.as_deref(), self.limit.as_deref());
        let filter = StudentFilter {
            name: present(self.nome),
            email: present(self.email),
            registration: present(self.matricula),
            class_group: present(self.turma),
        };
        (filter, pagination)
    }
}
