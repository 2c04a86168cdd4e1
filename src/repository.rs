use crate::{
    error::RepoError,
    models::{Post, PostInput, User},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// PostRepository
///
/// The persistence contract the handlers are written against. Implementations own slug
/// uniqueness and serialize their own writes; handlers never lock anything.
///
/// **Send + Sync + async_trait** are required so the trait object (`Arc<dyn PostRepository>`)
/// can live in the shared Axum state.
#[async_trait]
pub trait PostRepository: Send + Sync {
    // --- Posts ---
    // Every post, in creation order.
    async fn get_posts(&self) -> Result<Vec<Post>, RepoError>;
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, RepoError>;
    // Fails with SlugTaken if the slug is in use.
    async fn create_post(&self, input: PostInput) -> Result<Post, RepoError>;
    // Overwrites every field of the post stored under `slug`. A different `input.slug`
    // re-keys the post, re-checking uniqueness.
    async fn update_post(&self, slug: &str, input: PostInput) -> Result<Post, RepoError>;
    // Delete-if-present. Deleting a missing slug is not an error.
    async fn delete_post(&self, slug: &str) -> Result<(), RepoError>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn PostRepository>;

/// PostgresRepository
///
/// `PostRepository` backed by PostgreSQL. Queries are checked at runtime so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a unique-key violation on `posts.slug` to `SlugTaken`.
fn map_write_error(err: sqlx::Error, slug: &str) -> RepoError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::SlugTaken(slug.to_string())
        }
        other => RepoError::Database(other),
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"SELECT slug, title, markdown, created_at, updated_at FROM posts ORDER BY created_at ASC, slug ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_posts error: {:?}", e);
            e
        })?;
        Ok(posts)
    }

    async fn get_post(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let post = sqlx::query_as::<_, Post>(
            r#"SELECT slug, title, markdown, created_at, updated_at FROM posts WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn create_post(&self, input: PostInput) -> Result<Post, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (slug, title, markdown, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING slug, title, markdown, created_at, updated_at
            "#,
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.markdown)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &input.slug))
    }

    /// update_post
    ///
    /// The slug column is the primary key, so a rename is a plain `SET slug = $2`; the
    /// unique constraint re-checks it.
    async fn update_post(&self, slug: &str, input: PostInput) -> Result<Post, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET slug = $2,
                title = $3,
                markdown = $4,
                updated_at = NOW()
            WHERE slug = $1
            RETURNING slug, title, markdown, created_at, updated_at
            "#,
        )
        .bind(slug)
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.markdown)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &input.slug))?
        .ok_or_else(|| RepoError::NotFound(slug.to_string()))
    }

    async fn delete_post(&self, slug: &str) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            tracing::debug!(slug, "delete_post: nothing to delete");
        }
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// InMemoryRepository
///
/// `PostRepository` kept in process memory. Used when no `DATABASE_URL` is configured
/// locally, and by the test suites.
#[derive(Default)]
pub struct InMemoryRepository {
    posts: RwLock<Vec<Post>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing posts, kept in the given order.
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
            users: RwLock::default(),
        }
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
        Ok(self.posts.read().await.clone())
    }

    async fn get_post(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .find(|post| post.slug == slug)
            .cloned())
    }

    async fn create_post(&self, input: PostInput) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|post| post.slug == input.slug) {
            return Err(RepoError::SlugTaken(input.slug));
        }
        let now = Utc::now();
        let post = Post {
            slug: input.slug,
            title: input.title,
            markdown: input.markdown,
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, slug: &str, input: PostInput) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let index = posts
            .iter()
            .position(|post| post.slug == slug)
            .ok_or_else(|| RepoError::NotFound(slug.to_string()))?;

        if input.slug != slug && posts.iter().any(|post| post.slug == input.slug) {
            return Err(RepoError::SlugTaken(input.slug));
        }

        let post = &mut posts[index];
        post.slug = input.slug;
        post.title = input.title;
        post.markdown = input.markdown;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, slug: &str) -> Result<(), RepoError> {
        self.posts.write().await.retain(|post| post.slug != slug);
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
