use std::env;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_DB: &str = "sqlite://aula.db?mode=rwc";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the Moodle proxy, without a trailing slash.
    pub api_base_url: String,
    pub timeout: Duration,
    pub session_db_url: String,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_db_url: DEFAULT_SESSION_DB.to_string(),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let api_base_url = env::var("AULA_API_BASE_URL")
            .map_err(|_| AppError::Config("AULA_API_BASE_URL is not set".to_string()))?;
        if api_base_url.trim().is_empty() {
            return Err(AppError::Config("AULA_API_BASE_URL is empty".to_string()));
        }

        let timeout = match env::var("AULA_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    AppError::Config(format!("AULA_TIMEOUT_SECS is not a number: {}", raw))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let session_db_url =
            env::var("AULA_SESSION_DB").unwrap_or_else(|_| DEFAULT_SESSION_DB.to_string());

        Ok(Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            timeout,
            session_db_url,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base_url, path)
        } else {
            format!("{}/{}", self.api_base_url, path)
        }
    }
}
