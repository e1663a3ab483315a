use super::{DELETED, EMPTY_UPDATE, Outcome, not_found, page_of};
use crate::{
    error::ApiError,
    models::{MessageResponse, Pagination, StudentFilter, StudentForm, StudentPatch, StudentProfile},
    password::PasswordHasher,
    repository::Repository,
};

pub async fn list(
    repo: &dyn Repository,
    filter: StudentFilter,
    page: Pagination,
) -> Result<Outcome<Vec<StudentProfile>>, ApiError> {
    let rows = repo.list_students(&filter, page).await?;
    Ok(page_of(rows))
}

pub async fn create(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    form: StudentForm,
) -> Result<Outcome<StudentProfile>, ApiError> {
    let hash = hasher.hash(&form.password).await?;
    let student = repo.create_student(form.into_record(hash)).await?;
    tracing::info!(student_id = %student.id, "student created");
    Ok(Outcome::Created(student.into()))
}

pub async fn update(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    id: &str,
    patch: StudentPatch,
) -> Result<Outcome<StudentProfile>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_UPDATE.into()));
    }
    let hash = match &patch.password {
        Some(plain) => Some(hasher.hash(plain).await?),
        None => None,
    };
    repo.update_student(id, patch.into_changes(hash))
        .await?
        .map(|s| Outcome::Ok(s.into()))
        .ok_or_else(|| not_found("student"))
}

pub async fn delete(repo: &dyn Repository, id: &str) -> Result<Outcome<MessageResponse>, ApiError> {
    if repo.delete_student(id).await? {
        tracing::info!(student_id = %id, "student deleted");
        Ok(Outcome::Ok(MessageResponse::new(DELETED)))
    } else {
        Err(not_found("student"))
    }
}
