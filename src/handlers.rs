use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, RepoError},
    forms::{FormError, Intent, NEW_POST_SLUG, PostForm},
    models::{ErrorPage, Post, PostEditor, PostListing, ValidationErrors},
};
use axum::{
    Extension, Form, Json,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

/// Where every successful admin write sends the client.
pub const ADMIN_INDEX_PATH: &str = "/posts/admin";

// --- Extractor Structs ---

/// PostParams
///
/// The `{slug}` route segment of the admin routes. A missing slug is an invariant
/// failure raised by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct PostParams {
    pub slug: Option<String>,
}

impl PostParams {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
        }
    }
}

fn require_slug(params: PostParams) -> Result<String, AppError> {
    params
        .slug
        .ok_or_else(|| AppError::invariant("params.slug is required"))
}

/// AdminAction
///
/// Terminal states of a post submission: back to the admin listing, or back to the form
/// with per-field errors.
#[derive(Debug, PartialEq, Eq)]
pub enum AdminAction {
    Redirect(String),
    Invalid(ValidationErrors),
}

impl AdminAction {
    fn to_admin_index() -> Self {
        AdminAction::Redirect(ADMIN_INDEX_PATH.to_string())
    }
}

impl IntoResponse for AdminAction {
    fn into_response(self) -> Response {
        match self {
            AdminAction::Redirect(location) => Redirect::to(&location).into_response(),
            AdminAction::Invalid(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
            }
        }
    }
}

// --- Handlers ---

/// list_posts
///
/// [Public Route] Every post in store order, plus the admin identity when the visitor
/// is an admin.
#[utoipa::path(
    get,
    path = "/posts",
    responses(
        (status = 200, description = "Post listing", body = PostListing),
        (status = 500, description = "Store failure", body = ErrorPage)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    admin: Option<AdminUser>,
) -> Result<Json<PostListing>, AppError> {
    let posts = state.repo.get_posts().await?;
    Ok(Json(PostListing {
        posts,
        admin: admin.map(Into::into),
    }))
}

/// get_post
///
/// [Public Route] A single post by slug.
#[utoipa::path(
    get,
    path = "/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found", body = ErrorPage)
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, AppError> {
    state
        .repo
        .get_post(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::post_not_found(&slug))
}

/// admin_index
///
/// [Admin Route] The listing every successful submission redirects to.
#[utoipa::path(
    get,
    path = "/posts/admin",
    responses(
        (status = 200, description = "Admin listing", body = PostListing),
        (status = 303, description = "Redirect to login")
    )
)]
pub async fn admin_index(
    Extension(admin): Extension<AdminUser>,
    State(state): State<AppState>,
) -> Result<Json<PostListing>, AppError> {
    let posts = state.repo.get_posts().await?;
    Ok(Json(PostListing {
        posts,
        admin: Some(admin.into()),
    }))
}

/// get_admin_post
///
/// [Admin Route] Loads the editor. `new` yields a blank form without touching the store.
#[utoipa::path(
    get,
    path = "/posts/admin/{slug}",
    params(("slug" = String, Path, description = "Post slug, or `new` for a blank form")),
    responses(
        (status = 200, description = "Editor model", body = PostEditor),
        (status = 303, description = "Redirect to login"),
        (status = 404, description = "Not Found", body = ErrorPage)
    )
)]
pub async fn get_admin_post(
    State(state): State<AppState>,
    Path(params): Path<PostParams>,
) -> Result<Json<PostEditor>, AppError> {
    let slug = require_slug(params)?;
    if slug == NEW_POST_SLUG {
        return Ok(Json(PostEditor { post: None }));
    }

    match state.repo.get_post(&slug).await? {
        Some(post) => Ok(Json(PostEditor { post: Some(post) })),
        None => {
            tracing::debug!(%slug, "editor requested for unknown post");
            Err(AppError::post_not_found(&slug))
        }
    }
}

/// save_post
///
/// [Admin Route] Handles the editor's submission.
///
/// *Flow*: delete acts on the route slug without validation. Create and update validate
/// `title`, `slug` and `markdown` first; a missing field comes back as a 422 error map and
/// the store is not called. Update is keyed by the route slug, so a changed `slug` field
/// renames the post.
#[utoipa::path(
    post,
    path = "/posts/admin/{slug}",
    params(("slug" = String, Path, description = "Post slug, or `new` for a blank form")),
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Fields: intent (create | update | delete), title, slug, markdown"
    ),
    responses(
        (status = 303, description = "Saved; redirect to /posts/admin (or to login)"),
        (status = 422, description = "Missing fields", body = ValidationErrors),
        (status = 500, description = "Malformed submission", body = ErrorPage)
    )
)]
pub async fn save_post(
    Extension(admin): Extension<AdminUser>,
    State(state): State<AppState>,
    Path(params): Path<PostParams>,
    fields: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<AdminAction, AppError> {
    let route_slug = require_slug(params)?;
    let Form(fields) = fields.map_err(|rejection| AppError::invariant(rejection.body_text()))?;

    if !state.config.write_delay.is_zero() {
        tokio::time::sleep(state.config.write_delay).await;
    }

    let form = PostForm::from_pairs(fields);
    let intent = form.intent(&route_slug)?;
    tracing::info!(admin = %admin.email, ?intent, slug = %route_slug, "post submission");

    let saved = match intent {
        Intent::Delete => {
            state.repo.delete_post(&route_slug).await?;
            return Ok(AdminAction::to_admin_index());
        }
        Intent::Create => match form.validate() {
            Ok(input) => state.repo.create_post(input).await,
            Err(rejection) => return rejected(rejection),
        },
        Intent::Update => match form.validate() {
            Ok(input) => state.repo.update_post(&route_slug, input).await,
            Err(rejection) => return rejected(rejection),
        },
    };
    finish_write(saved)
}

/// Missing fields go back to the form; a malformed submission is a broken contract.
fn rejected(rejection: FormError) -> Result<AdminAction, AppError> {
    match rejection {
        FormError::Invalid(errors) => Ok(AdminAction::Invalid(errors)),
        FormError::Malformed(message) => Err(AppError::Invariant(message)),
    }
}

/// Turns the store's answer into the handler's terminal state. A slug collision is
/// something the user can fix, so it goes back to the form.
fn finish_write(saved: Result<Post, RepoError>) -> Result<AdminAction, AppError> {
    match saved {
        Ok(post) => {
            tracing::info!(slug = %post.slug, "post saved");
            Ok(AdminAction::to_admin_index())
        }
        Err(RepoError::SlugTaken(slug)) => {
            Ok(AdminAction::Invalid(ValidationErrors::slug_taken(&slug)))
        }
        Err(other) => Err(other.into()),
    }
}
