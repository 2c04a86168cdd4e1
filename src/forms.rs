//! Decoding of the admin post form.
//!
//! A submission arrives as raw `application/x-www-form-urlencoded` pairs. It is decoded
//! once into a [`PostForm`], whose [`PostForm::validate`] yields either the typed
//! [`PostInput`] or one of two failures: a recoverable per-field error map, or a malformed
//! submission that is treated as a broken contract.

use serde::{Deserialize, Serialize};
use std::mem;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{PostInput, ValidationErrors},
};

/// Route slug that addresses the blank creation form instead of a stored post.
pub const NEW_POST_SLUG: &str = "new";

/// Intent
///
/// Which write operation a submission performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Update,
    Delete,
}

impl Intent {
    /// Strict: any value other than the three intents is rejected, not read as create/update.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Intent::Create),
            "update" => Some(Intent::Update),
            "delete" => Some(Intent::Delete),
            _ => None,
        }
    }

    /// Intent implied by the route when the client sent none: the blank form creates,
    /// an existing post's form updates.
    pub fn for_route(route_slug: &str) -> Self {
        if route_slug == NEW_POST_SLUG {
            Intent::Create
        } else {
            Intent::Update
        }
    }
}

/// FormField
///
/// One named field of the submission, keeping track of repeated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormField {
    #[default]
    Missing,
    Value(String),
    Repeated(Vec<String>),
}

impl FormField {
    fn push(&mut self, value: String) {
        *self = match mem::take(self) {
            FormField::Missing => FormField::Value(value),
            FormField::Value(first) => FormField::Repeated(vec![first, value]),
            FormField::Repeated(mut values) => {
                values.push(value);
                FormField::Repeated(values)
            }
        };
    }

    /// Absent or empty. For repeated keys only the first value counts.
    fn is_blank(&self) -> bool {
        match self {
            FormField::Missing => true,
            FormField::Value(value) => value.is_empty(),
            FormField::Repeated(values) => values.first().is_none_or(|v| v.is_empty()),
        }
    }

    fn into_string(self, name: &str) -> Result<String, FormError> {
        match self {
            FormField::Value(value) => Ok(value),
            _ => Err(FormError::Malformed(format!("{name} must be a string"))),
        }
    }
}

/// FormError
///
/// Why a create/update submission could not become a `PostInput`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// The user left required fields empty. Rendered back on the form.
    #[error("required fields are missing")]
    Invalid(ValidationErrors),
    /// The submission does not have the shape the form produces.
    #[error("{0}")]
    Malformed(String),
}

/// PostForm
///
/// A decoded, not yet validated, post submission. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub intent: FormField,
    pub title: FormField,
    pub slug: FormField,
    pub markdown: FormField,
}

impl PostForm {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = PostForm::default();
        for (key, value) in pairs {
            let field = match key.as_str() {
                "intent" => &mut form.intent,
                "title" => &mut form.title,
                "slug" => &mut form.slug,
                "markdown" => &mut form.markdown,
                _ => continue,
            };
            field.push(value);
        }
        form
    }

    /// Resolves the submission's intent. A missing intent falls back to
    /// [`Intent::for_route`]; anything unrecognised is a broken contract.
    pub fn intent(&self, route_slug: &str) -> Result<Intent, AppError> {
        match &self.intent {
            FormField::Missing => Ok(Intent::for_route(route_slug)),
            FormField::Value(value) => Intent::parse(value)
                .ok_or_else(|| AppError::invariant(format!("unknown intent \"{value}\""))),
            FormField::Repeated(_) => Err(AppError::invariant("intent must be a string")),
        }
    }

    /// validate
    ///
    /// All three fields are checked independently, so one pass reports every missing
    /// field. Only a fully filled-in form is then checked for repeated keys.
    pub fn validate(self) -> Result<PostInput, FormError> {
        let required = |field: &FormField, message: &str| {
            field.is_blank().then(|| message.to_string())
        };
        let errors = ValidationErrors {
            title: required(&self.title, "Title is required"),
            slug: required(&self.slug, "Slug is required"),
            markdown: required(&self.markdown, "Markdown is required"),
        };
        if !errors.is_empty() {
            return Err(FormError::Invalid(errors));
        }

        Ok(PostInput {
            title: self.title.into_string("title")?,
            slug: self.slug.into_string("slug")?,
            markdown: self.markdown.into_string("markdown")?,
        })
    }
}
