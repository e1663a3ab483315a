use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    models::Role,
    token::{TokenService, TokenState},
};

/// AuthUser
///
/// The resolved identity of an authenticated request: `{id, email, role}` decoded from
/// the bearer token. It lives in the request's extensions for the duration of one
/// request and is handed to handlers by value; nothing about it is shared across
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    /// Kept as the raw claim so role checks are exact, case-sensitive string matches.
    pub role: String,
}

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively. A missing or blank header is `MissingToken`; anything else that
/// is not a usable bearer credential is `InvalidToken`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?
        .trim();

    if value.is_empty() {
        return Err(ApiError::MissingToken);
    }

    let (scheme, token) = value.split_once(' ').ok_or(ApiError::InvalidToken)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiError::InvalidToken);
    }
    Ok(token)
}

/// authenticate_headers
///
/// Header extraction plus token verification. Pure: no store access, no side effects.
pub fn authenticate_headers(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;
    tokens.verify(token).map_err(|_| ApiError::InvalidToken)
}

/// require_role
///
/// Passes only when an identity is attached and its role equals `role` exactly
/// (`"Teacher"` is not `"teacher"`). Absent identity is treated like a wrong role.
pub fn require_role(identity: Option<&AuthUser>, role: Role) -> Result<(), ApiError> {
    match identity {
        Some(user) if user.role == role.as_str() => Ok(()),
        _ => Err(ApiError::Forbidden(role)),
    }
}

/// authenticate
///
/// First gate on protected routes. Verifies the bearer token and attaches the decoded
/// `AuthUser` to the request before handing it on. Rejects with 401 otherwise.
pub async fn authenticate(
    State(tokens): State<TokenState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate_headers(request.headers(), &tokens).inspect_err(|e| {
        tracing::debug!(reason = %e, "rejected unauthenticated request");
    })?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// require_teacher
///
/// Second gate, layered inside `authenticate`. Rejects with 403 unless the attached
/// identity is a teacher.
pub async fn require_teacher(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(request.extensions().get::<AuthUser>(), Role::Teacher).inspect_err(|_| {
        tracing::info!(uri = %request.uri(), "teacher-only route denied");
    })?;
    Ok(next.run(request).await)
}

/// AuthUser Extractor Implementation
///
/// Handlers behind the gate take `AuthUser` as an argument. The identity attached by
/// `authenticate` is reused when present; otherwise the token is verified here, so the
/// extractor is also safe to use on a route that is not layered.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let tokens = TokenState::from_ref(state);
        authenticate_headers(&parts.headers, &tokens)
    }
}
