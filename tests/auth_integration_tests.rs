use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
    response::IntoResponse,
};
use blog_cms::{
    AppState,
    auth::{AdminUser, AuthUser, Claims},
    config::{AppConfig, Env},
    error::{AppError, RepoError},
    models::{ErrorPage, Post, PostInput, User},
    repository::{InMemoryRepository, PostRepository},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const ADMIN_ID: Uuid = Uuid::from_u128(1);
const READER_ID: Uuid = Uuid::from_u128(2);

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(user_id: Uuid, exp: u64) -> String {
    let claims = Claims {
        sub: user_id,
        iat: now() as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

async fn create_app_state(env: Env) -> AppState {
    let repo = InMemoryRepository::new();
    repo.insert_user(User {
        id: ADMIN_ID,
        email: "admin@blog.test".to_string(),
        role: "admin".to_string(),
    })
    .await;
    repo.insert_user(User {
        id: READER_ID,
        email: "reader@blog.test".to_string(),
        role: "reader".to_string(),
    })
    .await;

    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo: Arc::new(repo),
        config,
    }
}

// Profile store that is down: every call fails.
struct UnavailableRepo;

#[async_trait]
impl PostRepository for UnavailableRepo {
    async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn get_post(&self, _slug: &str) -> Result<Option<Post>, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn create_post(&self, _input: PostInput) -> Result<Post, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn update_post(&self, _slug: &str, _input: PostInput) -> Result<Post, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn delete_post(&self, _slug: &str) -> Result<(), RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
}

fn create_unavailable_state(env: Env) -> AppState {
    AppState {
        repo: Arc::new(UnavailableRepo),
        config: AppConfig {
            env,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            ..AppConfig::default()
        },
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

fn with_bypass(parts: &mut Parts, user_id: Uuid) {
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
}

async fn require_admin(parts: &mut Parts, state: &AppState) -> Result<AdminUser, AppError> {
    <AdminUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await
}

async fn try_optional_admin(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<AdminUser>, AppError> {
    <AdminUser as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state).await
}

async fn optional_admin(parts: &mut Parts, state: &AppState) -> Option<AdminUser> {
    try_optional_admin(parts, state).await.unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &create_token(READER_ID, now() + 3600));

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(user.id, READER_ID);
    assert_eq!(user.role, "reader");
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Well past the default 60s leeway.
    with_bearer(&mut parts, &create_token(ADMIN_ID, now() - 3600));

    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_unknown_profile() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &create_token(Uuid::new_v4(), now() + 3600));

    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = create_app_state(Env::Local).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bypass(&mut parts, ADMIN_ID);

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(user.id, ADMIN_ID);
    assert_eq!(user.role, "admin");
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bypass(&mut parts, ADMIN_ID);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_guard_accepts_admin_token() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::POST, "/posts/admin/new".parse().unwrap());
    with_bearer(&mut parts, &create_token(ADMIN_ID, now() + 3600));

    let admin = require_admin(&mut parts, &state).await.unwrap();

    assert_eq!(admin.id, ADMIN_ID);
    assert_eq!(admin.email, "admin@blog.test");
}

#[tokio::test]
async fn test_admin_guard_rejects_reader_with_login_redirect() {
    let state = create_app_state(Env::Local).await;
    let mut parts = get_request_parts(Method::GET, "/posts/admin/hello?tab=1".parse().unwrap());
    with_bypass(&mut parts, READER_ID);

    let err = require_admin(&mut parts, &state).await.unwrap_err();

    match err {
        AppError::Unauthorized {
            login_path,
            redirect_to,
        } => {
            assert_eq!(login_path, "/login");
            assert_eq!(redirect_to, "/posts/admin/hello?tab=1");
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_admin_guard_rejection_redirects() {
    let state = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/posts/admin/new".parse().unwrap());

    let err = require_admin(&mut parts, &state).await.unwrap_err();
    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/login?redirectTo=%2Fposts%2Fadmin%2Fnew"
    );
}

#[tokio::test]
async fn test_optional_admin_is_none_for_anonymous_and_readers() {
    let state = create_app_state(Env::Local).await;

    let mut anonymous = get_request_parts(Method::GET, "/posts".parse().unwrap());
    assert!(optional_admin(&mut anonymous, &state).await.is_none());

    let mut reader = get_request_parts(Method::GET, "/posts".parse().unwrap());
    with_bypass(&mut reader, READER_ID);
    assert!(optional_admin(&mut reader, &state).await.is_none());

    let mut garbage = get_request_parts(Method::GET, "/posts".parse().unwrap());
    with_bearer(&mut garbage, "not-a-jwt");
    assert!(optional_admin(&mut garbage, &state).await.is_none());
}

#[tokio::test]
async fn test_optional_admin_resolves_admin() {
    let state = create_app_state(Env::Local).await;
    let mut parts = get_request_parts(Method::GET, "/posts".parse().unwrap());
    with_bypass(&mut parts, ADMIN_ID);

    let admin = optional_admin(&mut parts, &state).await;

    assert_eq!(admin.map(|a| a.id), Some(ADMIN_ID));
}

#[tokio::test]
async fn test_admin_guard_store_failure_renders_error_page() {
    let state = create_unavailable_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/posts/admin/hello".parse().unwrap());
    with_bearer(&mut parts, &create_token(ADMIN_ID, now() + 3600));

    let err = require_admin(&mut parts, &state).await.unwrap_err();
    assert!(matches!(err, AppError::Repo(RepoError::Database(_))));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page: ErrorPage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(page.heading, "Uh oh ...");
    assert_eq!(page.message, "Something went wrong.");
    assert!(page.detail.is_some());
}

#[tokio::test]
async fn test_local_bypass_store_failure_is_not_swallowed() {
    let state = create_unavailable_state(Env::Local);
    let mut parts = get_request_parts(Method::GET, "/posts/admin".parse().unwrap());
    with_bypass(&mut parts, ADMIN_ID);

    let err = require_admin(&mut parts, &state).await.unwrap_err();
    assert!(matches!(err, AppError::Repo(_)));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bypass(&mut parts, ADMIN_ID);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_optional_admin_store_failure_is_an_error() {
    let state = create_unavailable_state(Env::Production);

    let mut anonymous = get_request_parts(Method::GET, "/posts".parse().unwrap());
    assert!(try_optional_admin(&mut anonymous, &state).await.unwrap().is_none());

    let mut signed_in = get_request_parts(Method::GET, "/posts".parse().unwrap());
    with_bearer(&mut signed_in, &create_token(ADMIN_ID, now() + 3600));
    let err = try_optional_admin(&mut signed_in, &state).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
