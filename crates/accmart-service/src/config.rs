//! Service configuration.

use std::path::Path;

use serde::Deserialize;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. Without one the service keeps its data in memory.
    pub database_url: Option<String>,

    /// Upper bound on pooled database connections (default: 10).
    pub database_max_connections: u32,

    /// HS256 secret used to validate user JWTs. Without one every JWT is rejected.
    pub auth_jwt_secret: Option<String>,

    /// Expected JWT audience (default: "authenticated").
    pub auth_audience: String,

    /// Paystack secret key, used for verification calls and webhook signatures.
    pub paystack_secret_key: Option<String>,

    /// Paystack API base URL (default: `<https://api.paystack.co>`).
    pub paystack_base_url: String,

    /// Admins that can never be demoted, matched case-insensitively by email.
    pub protected_admin_emails: Vec<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Paystack secrets file structure.
#[derive(Debug, Deserialize)]
struct PaystackSecrets {
    secret_key: String,
    #[serde(default)]
    base_url: Option<String>,
}

/// Default Paystack API base URL.
pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load Paystack secrets from file first, then fall back to env vars
        let (paystack_secret_key, paystack_base_url) = load_paystack_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok().filter(|s| !s.is_empty()),
            auth_audience: std::env::var("AUTH_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".into()),
            paystack_secret_key,
            paystack_base_url,
            protected_admin_emails: split_list(
                &std::env::var("PROTECTED_ADMIN_EMAILS").unwrap_or_default(),
            ),
            cors_origins: split_list(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
            ),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Load Paystack secrets from file or environment.
fn load_paystack_secrets() -> (Option<String>, String) {
    let secret_paths = [".secrets/paystack.json", "../.secrets/paystack.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<PaystackSecrets>(Path::new(path)) {
            tracing::info!(path = %path, "Loaded Paystack secrets from file");
            return (
                Some(secrets.secret_key),
                secrets
                    .base_url
                    .unwrap_or_else(|| DEFAULT_PAYSTACK_BASE_URL.into()),
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Paystack secrets file not found, using environment variables");
    (
        std::env::var("PAYSTACK_SECRET_KEY").ok().filter(|s| !s.is_empty()),
        std::env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| DEFAULT_PAYSTACK_BASE_URL.into()),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, std::io::Error> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            auth_jwt_secret: None,
            auth_audience: "authenticated".into(),
            paystack_secret_key: None,
            paystack_base_url: DEFAULT_PAYSTACK_BASE_URL.into(),
            protected_admin_emails: Vec::new(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
