use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, RepoError},
    models::{AdminIdentity, User},
    repository::RepositoryState,
};

/// The role that unlocks the post editor.
pub const ADMIN_ROLE: &str = "admin";

/// Claims
///
/// Payload expected inside the bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the profile id looked up in `profiles`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// Any signed-in profile, admin or not.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// AdminUser
///
/// A signed-in profile with the `admin` role. Taking this as a handler argument is the
/// admin guard: extraction fails with `AppError::Unauthorized`, which redirects to login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
}

impl From<AdminUser> for AdminIdentity {
    fn from(admin: AdminUser) -> Self {
        AdminIdentity {
            id: admin.id,
            email: admin.email,
        }
    }
}

/// AuthFailure
///
/// Why a request could not be resolved to a profile.
#[derive(Debug)]
enum AuthFailure {
    /// No usable credentials, or they name no profile.
    NoIdentity,
    /// The profile lookup itself failed.
    Store(RepoError),
}

/// authenticate
///
/// Resolves the request to a stored profile:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing profile.
/// 2. Otherwise a `Bearer` JWT whose `sub` names an existing profile.
///
/// A failing store is reported as such and never as a missing identity.
async fn authenticate(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<User, AuthFailure> {
    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.get_user(user_id).await.map_err(AuthFailure::Store)? {
                return Ok(user);
            }
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthFailure::NoIdentity)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
            other => tracing::debug!(?other, "rejected invalid token"),
        }
        AuthFailure::NoIdentity
    })?;

    repo.get_user(token_data.claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "profile lookup failed during authentication");
            AuthFailure::Store(e)
        })?
        .ok_or(AuthFailure::NoIdentity)
}

/// Resolves an admin from the request. `Ok(None)` means there is no admin identity.
async fn resolve_admin<S>(parts: &Parts, state: &S) -> Result<Option<AdminUser>, RepoError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);
    let user = match authenticate(parts, &repo, &config).await {
        Ok(user) => user,
        Err(AuthFailure::NoIdentity) => return Ok(None),
        Err(AuthFailure::Store(e)) => return Err(e),
    };
    Ok((user.role == ADMIN_ROLE).then(|| AdminUser {
        id: user.id,
        email: user.email,
    }))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        match authenticate(parts, &repo, &config).await {
            Ok(user) => Ok(AuthUser::from(user)),
            Err(AuthFailure::NoIdentity) => Err(StatusCode::UNAUTHORIZED),
            Err(AuthFailure::Store(_)) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_admin(parts, state).await? {
            Some(admin) => Ok(admin),
            None => {
                let config = AppConfig::from_ref(state);
                let redirect_to = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(AppError::Unauthorized {
                    login_path: config.login_path,
                    redirect_to,
                })
            }
        }
    }
}

/// `Option<AdminUser>` is how the public listing learns whether to show admin
/// affordances. It only rejects when the profile store fails.
impl<S> OptionalFromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolve_admin(parts, state).await?)
    }
}
