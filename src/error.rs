use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::models::ErrorPage;

/// RepoError
///
/// Failures raised by a `PostRepository` implementation.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Another post already owns the slug (create, or update that renames).
    #[error("the slug \"{0}\" is already taken")]
    SlugTaken(String),
    /// Update addressed a slug that no post has.
    #[error("the post with the slug \"{0}\" does not exist")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// AppError
///
/// Every failure a request can end in. Validation problems are not in here: they are
/// ordinary data returned by the write handler.
#[derive(Debug, Error)]
pub enum AppError {
    /// No admin identity. Sends the client to the login surface.
    #[error("admin sign-in required")]
    Unauthorized {
        login_path: String,
        redirect_to: String,
    },
    /// A contract the caller should have upheld was broken (missing route parameter,
    /// malformed form field). Not user-recoverable.
    #[error("Invariant failed: {0}")]
    Invariant(String),
    #[error("{message}")]
    NotFound { message: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AppError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    pub fn post_not_found(slug: &str) -> Self {
        Self::NotFound {
            message: format!("Uh oh! the post with the slug \"{slug}\" is not found"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized { .. } => StatusCode::SEE_OTHER,
            AppError::NotFound { .. } | AppError::Repo(RepoError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Invariant(_)
            | AppError::Repo(RepoError::SlugTaken(_) | RepoError::Database(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Location the login redirect points at, `<login_path>?redirectTo=<path>`.
    fn login_location(login_path: &str, redirect_to: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirectTo", redirect_to)
            .finish();
        format!("{login_path}?{query}")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::Unauthorized {
                login_path,
                redirect_to,
            } => {
                tracing::debug!(%redirect_to, "admin identity missing, redirecting to login");
                Redirect::to(&Self::login_location(&login_path, &redirect_to)).into_response()
            }
            AppError::NotFound { message } => {
                (status, Json(ErrorPage::status(status.as_u16(), message))).into_response()
            }
            AppError::Repo(RepoError::NotFound(slug)) => {
                let message = Self::post_not_found(&slug).to_string();
                (status, Json(ErrorPage::status(status.as_u16(), message))).into_response()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (status, Json(ErrorPage::unexpected(other.to_string()))).into_response()
            }
        }
    }
}
