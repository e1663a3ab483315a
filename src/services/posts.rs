use super::{DELETED, EMPTY_UPDATE, Outcome, not_found, page_of};
use crate::{
    error::ApiError,
    models::{MessageResponse, Pagination, Post, PostChanges, PostFilter, PostForm},
    repository::Repository,
};

pub async fn list(
    repo: &dyn Repository,
    filter: PostFilter,
    page: Pagination,
) -> Result<Outcome<Vec<Post>>, ApiError> {
    let rows = repo.list_posts(&filter, page).await?;
    Ok(page_of(rows))
}

/// A missing id is 204, not an error.
pub async fn get(repo: &dyn Repository, id: &str) -> Result<Outcome<Post>, ApiError> {
    Ok(match repo.get_post(id).await? {
        Some(post) => Outcome::Ok(post),
        None => Outcome::NoContent,
    })
}

pub async fn create(repo: &dyn Repository, form: PostForm) -> Result<Outcome<Post>, ApiError> {
    let post = repo.create_post(form.into_record()).await?;
    Ok(Outcome::Created(post))
}

pub async fn update(
    repo: &dyn Repository,
    id: &str,
    changes: PostChanges,
) -> Result<Outcome<Post>, ApiError> {
    if changes.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_UPDATE.into()));
    }
    repo.update_post(id, changes)
        .await?
        .map(Outcome::Ok)
        .ok_or_else(|| not_found("post"))
}

pub async fn delete(repo: &dyn Repository, id: &str) -> Result<Outcome<MessageResponse>, ApiError> {
    if repo.delete_post(id).await? {
        Ok(Outcome::Ok(MessageResponse::new(DELETED)))
    } else {
        Err(not_found("post"))
    }
}
