use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub mod auth;
pub mod posts;
pub mod students;
pub mod teachers;

/// Outcome
///
/// Successful result of a service call together with the status it should be sent
/// with. Failures travel separately as `ApiError`.
#[derive(Debug, PartialEq)]
pub enum Outcome<T> {
    /// 200 with a JSON body.
    Ok(T),
    /// 201 with a JSON body.
    Created(T),
    /// 204, empty body.
    NoContent,
}

impl<T> Outcome<T> {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Ok(_) => StatusCode::OK,
            Outcome::Created(_) => StatusCode::CREATED,
            Outcome::NoContent => StatusCode::NO_CONTENT,
        }
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Outcome::Ok(body) | Outcome::Created(body) => (status, Json(body)).into_response(),
            Outcome::NoContent => status.into_response(),
        }
    }
}

/// An empty page is 204; otherwise each row is mapped to its wire type.
pub fn page_of<T, U>(rows: Vec<U>) -> Outcome<Vec<T>>
where
    T: From<U>,
{
    if rows.is_empty() {
        Outcome::NoContent
    } else {
        Outcome::Ok(rows.into_iter().map(T::from).collect())
    }
}

/// Message for an update or delete aimed at an id that does not exist.
pub(crate) fn not_found(resource: &str) -> crate::error::ApiError {
    crate::error::ApiError::BadRequest(format!("{resource} not found or invalid id"))
}

pub(crate) const EMPTY_UPDATE: &str = "no data sent for update";
pub(crate) const DELETED: &str = "deleted successfully";
