use std::{env, time::Duration};

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled into handlers
/// and extractors through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. Optional locally: without it the in-memory store is used.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // HS256 secret used to validate bearer tokens.
    pub jwt_secret: String,
    // Fixed pause before a post submission is processed.
    pub write_delay: Duration,
    // Where the admin guard sends requests without an admin identity.
    pub login_path: String,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: developer conveniences locally, strict secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_WRITE_DELAY_MS: u64 = 1000;

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests: local mode, in-memory store, no write delay.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            write_delay: Duration::ZERO,
            login_path: "/login".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production if `DATABASE_URL` or `JWT_SECRET` is missing, and in any
    /// environment if `WRITE_DELAY_MS` is not a number.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let write_delay_ms = env::var("WRITE_DELAY_MS")
            .map(|raw| {
                raw.parse::<u64>()
                    .expect("FATAL: WRITE_DELAY_MS must be a whole number of milliseconds")
            })
            .unwrap_or(DEFAULT_WRITE_DELAY_MS);

        Self {
            db_url,
            env,
            jwt_secret,
            write_delay: Duration::from_millis(write_delay_ms),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}
