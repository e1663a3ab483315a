use super::{DELETED, EMPTY_UPDATE, Outcome, not_found, page_of};
use crate::{
    error::ApiError,
    models::{MessageResponse, Pagination, TeacherFilter, TeacherForm, TeacherPatch, TeacherProfile},
    password::PasswordHasher,
    repository::Repository,
};

pub async fn list(
    repo: &dyn Repository,
    filter: TeacherFilter,
    page: Pagination,
) -> Result<Outcome<Vec<TeacherProfile>>, ApiError> {
    let rows = repo.list_teachers(&filter, page).await?;
    Ok(page_of(rows))
}

/// Hashes the password before anything is stored.
pub async fn create(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    form: TeacherForm,
) -> Result<Outcome<TeacherProfile>, ApiError> {
    let hash = hasher.hash(&form.password).await?;
    let teacher = repo.create_teacher(form.into_record(hash)).await?;
    tracing::info!(teacher_id = %teacher.id, "teacher created");
    Ok(Outcome::Created(teacher.into()))
}

/// A new password in the patch is rehashed; it is never stored as sent.
pub async fn update(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    id: &str,
    patch: TeacherPatch,
) -> Result<Outcome<TeacherProfile>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_UPDATE.into()));
    }
    let hash = match &patch.password {
        Some(plain) => Some(hasher.hash(plain).await?),
        None => None,
    };
    repo.update_teacher(id, patch.into_changes(hash))
        .await?
        .map(|t| Outcome::Ok(t.into()))
        .ok_or_else(|| not_found("teacher"))
}

pub async fn delete(repo: &dyn Repository, id: &str) -> Result<Outcome<MessageResponse>, ApiError> {
    if repo.delete_teacher(id).await? {
        tracing::info!(teacher_id = %id, "teacher deleted");
        Ok(Outcome::Ok(MessageResponse::new(DELETED)))
    } else {
        Err(not_found("teacher"))
    }
}
