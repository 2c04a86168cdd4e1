use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A profile row from the `profiles` table. The admin guard resolves the request's
/// identity to one of these and only looks at `role`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // 'admin' grants access to the post editor; anything else is a plain reader.
    pub role: String,
}

/// Post
///
/// A blog post from the `posts` table. The slug is the primary key and the route segment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub slug: String,
    pub title: String,
    /// Raw markdown body. Rendering happens in the view layer.
    pub markdown: String,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// PostInput
///
/// The validated field set handed to the store on create and update.
/// Updates overwrite every field; there is no partial patch.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    pub markdown: String,
}

/// ValidationErrors
///
/// Per-field messages for a rejected create/update submission. Present fields stay `null`
/// so the form can tell which inputs to flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct ValidationErrors {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub markdown: Option<String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.slug.is_none() && self.markdown.is_none()
    }

    /// Error map for a slug that collides with another post.
    pub fn slug_taken(slug: &str) -> Self {
        Self {
            slug: Some(format!("Slug \"{slug}\" is already taken")),
            ..Self::default()
        }
    }
}

// --- Render Models (Output) ---

/// AdminIdentity
///
/// What the views get to know about a signed-in admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub email: String,
}

/// PostListing
///
/// Render model for `GET /posts` and `GET /posts/admin`. `admin` is `null` for anonymous
/// visitors and non-admin users.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PostListing {
    pub posts: Vec<Post>,
    pub admin: Option<AdminIdentity>,
}

/// PostEditor
///
/// Render model for the admin form. An empty `post` means a blank creation form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PostEditor {
    pub post: Option<Post>,
}

/// ErrorPage
///
/// Body rendered by the error boundary. `detail` carries the raw failure message for
/// unexpected errors and is omitted for status pages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ErrorPage {
    pub heading: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorPage {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            heading: "Oops".to_string(),
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self {
            heading: "Uh oh ...".to_string(),
            status: 500,
            message: "Something went wrong.".to_string(),
            detail: Some(detail.into()),
        }
    }
}
