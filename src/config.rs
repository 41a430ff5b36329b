use std::env;
use std::path::PathBuf;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services
/// (Identity Store, Upload Pipeline, Admission Limiter). It is pulled into the
/// application state via FromRef, embodying the "immutable AppConfig" part of the
/// Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and identity store selection.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Directory that receives validated uploads; created idempotently at startup.
    pub upload_dir: PathBuf,
    // The single origin allowed by the CORS policy (the frontend shell).
    pub cors_origin: String,
    // Secret key used to sign and verify session tokens.
    pub token_secret: String,
    // Lifetime of an issued session token, in seconds.
    pub token_ttl_secs: i64,
    // Admission ceiling: maximum requests per client within one window.
    pub rate_limit_max: u32,
    // Admission window length, in seconds.
    pub rate_limit_window_secs: u64,
    // Database connection string (Postgres). Only required in production, where the
    // identity store is backed by a real database instead of the seeded one.
    pub db_url: Option<String>,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (seeded identity data, pretty logs) and production infrastructure (Postgres,
/// JSON logs, mandatory secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    /// Label reported by the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Local => "development",
            Env::Production => "production",
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows tests to instantiate the configuration without needing to set
    /// environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 3001,
            upload_dir: PathBuf::from("uploads"),
            cors_origin: "http://localhost:3000".to_string(),
            token_secret: "super-secure-test-secret-value-local".to_string(),
            token_ttl_secs: 86_400,
            rate_limit_max: 100,
            rate_limit_window_secs: 15 * 60,
            db_url: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the fail-fast
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the application
    /// from starting with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The production signing secret is mandatory and must be explicitly set.
        let token_secret = match env {
            Env::Production => {
                env::var("TOKEN_SECRET").expect("FATAL: TOKEN_SECRET must be set in production.")
            }
            _ => env::var("TOKEN_SECRET")
                .unwrap_or_else(|_| "super-secure-test-secret-value-local".to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
            ),
            _ => env::var("DATABASE_URL").ok(),
        };

        Self {
            env,
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            cors_origin: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            token_secret,
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15 * 60),
            db_url,
        }
    }
}
