use std::env;

/// Connection settings for the external chat endpoint. Every field has a
/// development default, so the backend boots with no environment at all and
/// simply runs in mock mode.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// Base URL of the chat API, never with a trailing slash.
    pub api_base_url: String,
    /// Gates network dispatch. When false, every prompt is answered from the
    /// canned catalogs.
    pub api_configured: bool,
    /// User identity sent with every chat request.
    pub test_user: String,
    pub api_key: String,
    /// Path segment appended to the base URL for chat calls.
    pub chat_path: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            api_configured: false,
            test_user: "testuser@myapp.com".to_string(),
            api_key: "1234".to_string(),
            chat_path: "chat".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Reads `CHAT_API_BASE_URL`, `CHAT_API_CONFIGURED`, `CHAT_TEST_USER`,
    /// `CHAT_API_KEY`, and `CHAT_API_PATH`. Unset or empty variables keep
    /// their defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            api_base_url: env_value("CHAT_API_BASE_URL")
                .map(|v| normalize_base_url(&v))
                .unwrap_or(base.api_base_url),
            api_configured: env_value("CHAT_API_CONFIGURED")
                .map(|v| flag_enabled(&v))
                .unwrap_or(base.api_configured),
            test_user: env_value("CHAT_TEST_USER").unwrap_or(base.test_user),
            api_key: env_value("CHAT_API_KEY").unwrap_or(base.api_key),
            chat_path: env_value("CHAT_API_PATH")
                .map(|v| normalize_path_segment(&v))
                .unwrap_or(base.chat_path),
        }
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/{}", self.api_base_url, self.chat_path)
    }
}

// Trim to remove any accidental whitespace (common on Windows with `set`).
fn env_value(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Strips at most one trailing slash, so joining a path never doubles it.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

fn normalize_path_segment(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}

/// Only the exact string "true" enables a flag.
fn flag_enabled(raw: &str) -> bool {
    raw.trim() == "true"
}
