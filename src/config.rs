use crate::error::ChapterError;
use std::time::Duration;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
const MODEL_VAR: &str = "GEMINI_MODEL";
const API_BASE_VAR: &str = "GEMINI_API_BASE";
const TIMEOUT_VAR: &str = "CHAPTERIZER_MODEL_TIMEOUT_SECS";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

impl Settings {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let request_timeout = non_empty(TIMEOUT_VAR)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Settings {
            api_key: non_empty(API_KEY_VAR),
            model: non_empty(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: non_empty(API_BASE_VAR)
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            request_timeout: Duration::from_secs(request_timeout),
        }
    }

    pub fn api_key(&self) -> Result<&str, ChapterError> {
        self.api_key.as_deref().ok_or_else(|| {
            ChapterError::Configuration(format!(
                "{} not found. Set it in a '.env' file or as an environment variable.",
                API_KEY_VAR
            ))
        })
    }
}
