use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Credentials, LoginResponse, Principal, SessionUser},
    password::PasswordHasher,
    repository::{RepoResult, Repository},
    token::TokenService,
};

/// resolve_principal
///
/// Teacher store first, then student store. A teacher match shadows any student with the
/// same email: the student store is not consulted once the teacher lookup hits.
pub async fn resolve_principal(
    repo: &dyn Repository,
    email: &str,
) -> RepoResult<Option<Principal>> {
    if let Some(teacher) = repo.find_teacher_by_email(email).await? {
        return Ok(Some(Principal::Teacher(teacher)));
    }
    Ok(repo
        .find_student_by_email(email)
        .await?
        .map(Principal::Student))
}

/// login
///
/// Exchanges credentials for a session token. Unknown email and wrong password fail
/// identically with `InvalidCredentials`; the hasher is not called for an unknown email.
/// A store fault surfaces as `Internal`, never as bad credentials.
pub async fn login(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    tokens: &TokenService,
    credentials: Credentials,
) -> Result<LoginResponse, ApiError> {
    let Some(principal) = resolve_principal(repo, &credentials.email).await? else {
        tracing::warn!(email = %credentials.email, "login rejected: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !hasher
        .verify(&credentials.password, principal.password_hash())
        .await
    {
        tracing::warn!(email = %credentials.email, "login rejected: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let role = principal.role();
    let identity = AuthUser {
        id: principal.id().to_string(),
        email: principal.email().to_string(),
        role: role.as_str().to_string(),
    };
    let token = tokens.issue(&identity)?;

    tracing::info!(user_id = %identity.id, role = role.as_str(), "login succeeded");

    Ok(LoginResponse {
        token,
        user: SessionUser {
            id: identity.id,
            name: principal.name().to_string(),
            email: identity.email,
            role,
        },
    })
}
