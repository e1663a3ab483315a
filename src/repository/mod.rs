use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{
    Pagination, Post, PostChanges, PostFilter, Student, StudentChanges, StudentFilter, Teacher,
    TeacherChanges, TeacherFilter,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Store-level failures. Kept distinct from "not found" (which is `Ok(None)` / `Ok(false)`)
/// so a connectivity fault can never be mistaken for an unknown account.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique column (email, cpf, matricula) already holds this value.
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Abstract contract for all persistence operations, so handlers and services never know
/// whether they are talking to Postgres or the in-memory store.
///
/// The two `find_*_by_email` methods are the credential store consumed by login: exact,
/// case-sensitive equality on the email column of one collection each.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    async fn find_teacher_by_email(&self, email: &str) -> RepoResult<Option<Teacher>>;
    async fn find_student_by_email(&self, email: &str) -> RepoResult<Option<Student>>;

    // --- Posts ---
    async fn list_posts(&self, filter: &PostFilter, page: Pagination) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: &str) -> RepoResult<Option<Post>>;
    async fn create_post(&self, post: Post) -> RepoResult<Post>;
    // Returns None when no post has this id.
    async fn update_post(&self, id: &str, changes: PostChanges) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: &str) -> RepoResult<bool>;

    // --- Teachers ---
    async fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Teacher>>;
    async fn create_teacher(&self, teacher: Teacher) -> RepoResult<Teacher>;
    async fn update_teacher(
        &self,
        id: &str,
        changes: TeacherChanges,
    ) -> RepoResult<Option<Teacher>>;
    async fn delete_teacher(&self, id: &str) -> RepoResult<bool>;

    // --- Students ---
    async fn list_students(
        &self,
        filter: &StudentFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Student>>;
    async fn create_student(&self, student: Student) -> RepoResult<Student>;
    async fn update_student(
        &self,
        id: &str,
        changes: StudentChanges,
    ) -> RepoResult<Option<Student>>;
    async fn delete_student(&self, id: &str) -> RepoResult<bool>;

    // --- Seeding ---
    async fn count_teachers(&self) -> RepoResult<i64>;
    async fn count_students(&self) -> RepoResult<i64>;
    async fn count_posts(&self) -> RepoResult<i64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
