//! Provider credentials and request defaults, read once at process start.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::model::ProviderKind;
use crate::vendors::openai::OpenAiCompatibleConfig;

/// Wenxin (ERNIE) credentials. No adapter consumes these yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WenxinCredentials {
    pub api_key: String,
    pub secret_key: String,
}

/// Spark credentials. No adapter consumes these yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparkCredentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Sampling and timing defaults applied to every provider call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDefaults {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whole-call timeout; `None` lets a call run until the stream ends.
    pub timeout: Option<Duration>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            timeout: None,
        }
    }
}

/// Per-provider credentials plus request defaults.
#[derive(Clone, Debug, Default)]
pub struct AiConfig {
    pub openai: Option<OpenAiCompatibleConfig>,
    pub deepseek: Option<OpenAiCompatibleConfig>,
    pub wenxin: Option<WenxinCredentials>,
    pub spark: Option<SparkCredentials>,
    pub defaults: RequestDefaults,
}

impl AiConfig {
    /// Reads credentials from the process environment.
    ///
    /// Environment variables:
    /// - `OPENAI_API_KEY`, `OPENAI_BASE_URL`
    /// - `DEEPSEEK_API_KEY`, `DEEPSEEK_BASE_URL`
    /// - `WENXIN_API_KEY`, `WENXIN_SECRET_KEY`
    /// - `SPARK_APP_ID`, `SPARK_API_KEY`, `SPARK_API_SECRET`
    /// - `QUILLMATE_TEMPERATURE`, `QUILLMATE_MAX_TOKENS`, `QUILLMATE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AiConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai = var("OPENAI_API_KEY").map(|key| {
            let config = OpenAiCompatibleConfig::new(key);
            match var("OPENAI_BASE_URL") {
                Some(url) => config.base_url(url),
                None => config,
            }
        });
        let deepseek = var("DEEPSEEK_API_KEY").map(|key| {
            let config = OpenAiCompatibleConfig::deepseek(key);
            match var("DEEPSEEK_BASE_URL") {
                Some(url) => config.base_url(url),
                None => config,
            }
        });
        let wenxin = var("WENXIN_API_KEY").map(|api_key| WenxinCredentials {
            api_key,
            secret_key: var("WENXIN_SECRET_KEY").unwrap_or_default(),
        });
        let spark = var("SPARK_API_KEY").map(|api_key| SparkCredentials {
            app_id: var("SPARK_APP_ID").unwrap_or_default(),
            api_key,
            api_secret: var("SPARK_API_SECRET").unwrap_or_default(),
        });

        let mut defaults = RequestDefaults::default();
        if let Some(t) = parse_var(&var, "QUILLMATE_TEMPERATURE") {
            defaults.temperature = t;
        }
        if let Some(n) = parse_var(&var, "QUILLMATE_MAX_TOKENS") {
            defaults.max_tokens = n;
        }
        defaults.timeout = parse_var::<u64>(&var, "QUILLMATE_TIMEOUT_SECS").map(Duration::from_secs);

        Self {
            openai,
            deepseek,
            wenxin,
            spark,
            defaults,
        }
    }

    pub fn openai(mut self, config: OpenAiCompatibleConfig) -> Self {
        self.openai = Some(config);
        self
    }

    pub fn deepseek(mut self, config: OpenAiCompatibleConfig) -> Self {
        self.deepseek = Some(config);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Whether credentials for `kind` were supplied.
    pub fn has_credentials(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai.is_some(),
            ProviderKind::DeepSeek => self.deepseek.is_some(),
            ProviderKind::Wenxin => self.wenxin.is_some(),
            ProviderKind::Spark => self.spark.is_some(),
            ProviderKind::Anthropic | ProviderKind::Google | ProviderKind::Custom => false,
        }
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_has_no_credentials() {
        let config = AiConfig::from_lookup(lookup(&[]));
        assert!(config.openai.is_none());
        assert!(!config.has_credentials(ProviderKind::DeepSeek));
        assert_eq!(config.defaults, RequestDefaults::default());
    }

    #[test]
    fn reads_keys_urls_and_defaults() {
        let config = AiConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_BASE_URL", "http://proxy/v1"),
            ("DEEPSEEK_API_KEY", "ds-1"),
            ("QUILLMATE_MAX_TOKENS", "512"),
            ("QUILLMATE_TIMEOUT_SECS", "30"),
            ("QUILLMATE_TEMPERATURE", "warm"),
        ]));
        let openai = config.openai.as_ref().expect("openai");
        assert_eq!(openai.base_url, "http://proxy/v1");
        let deepseek = config.deepseek.as_ref().expect("deepseek");
        assert_eq!(deepseek.base_url, OpenAiCompatibleConfig::DEEPSEEK_BASE_URL);
        assert_eq!(config.defaults.max_tokens, 512);
        assert_eq!(config.defaults.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.defaults.temperature, 0.7);
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let config = AiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")]));
        assert!(!config.has_credentials(ProviderKind::OpenAi));
    }
}
