use std::path::Path;
use std::time::Duration;

use crate::errors::ConsoleError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the remote service, without a trailing slash.
    pub backend_url: String,
    pub timeout: Duration,
    /// Credentials used by the CLI when no session cookie is present.
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ConsoleConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: normalize_url(backend_url.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            email: None,
            password: None,
        }
    }

    pub fn from_env() -> Result<Self, ConsoleError> {
        let backend_url = std::env::var("CONSOLE_BACKEND_URL")
            .map_err(|_| ConsoleError::configuration("CONSOLE_BACKEND_URL not set"))?;
        if backend_url.trim().is_empty() {
            return Err(ConsoleError::configuration("CONSOLE_BACKEND_URL must not be empty"));
        }

        let timeout_secs = std::env::var("CONSOLE_TIMEOUT_SECS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(DEFAULT_TIMEOUT_SECS))
            .map_err(|_| ConsoleError::configuration("CONSOLE_TIMEOUT_SECS must be a valid integer"))?;

        Ok(Self {
            backend_url: normalize_url(backend_url),
            timeout: Duration::from_secs(timeout_secs),
            email: non_empty_var("CONSOLE_EMAIL"),
            password: non_empty_var("CONSOLE_PASSWORD"),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.password = Some(password.into());
        self
    }
}

/// Loads `.env` from the working directory, falling back to the crate directory.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
