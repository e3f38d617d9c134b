use std::time::Duration;

use crate::errors::AiError;

/// Connection settings for an OpenAI-compatible Chat Completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL up to and including the API version segment
    /// (for example `https://api.openai.com/v1`).
    pub base_url: String,
    /// Connect timeout for the HTTP client. Whole-call timeouts are applied by
    /// the stream consumer.
    pub connect_timeout: Duration,
}

impl OpenAiCompatibleConfig {
    pub const OPENAI_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEEPSEEK_BASE_URL: &'static str = "https://api.deepseek.com/v1";

    /// Creates an OpenAI config with the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::OPENAI_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Creates a DeepSeek config with its OpenAI-compatible endpoint.
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new(api_key).base_url(Self::DEEPSEEK_BASE_URL)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), AiError> {
        if self.api_key.trim().is_empty() {
            return Err(AiError::Config("api key must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(AiError::Config("base url must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
