use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Hosted inference providers with an OpenAI-compatible chat endpoint.
///
/// Both speak the same wire format; the provider only decides the default
/// endpoint, credential variable and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Groq,
    Gemini,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible API.
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Model benchmarked when none is given.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "deepseek-r1-distill-llama-70b",
            Provider::Gemini => "gemini-2.0-flash-thinking-exp-01-21",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => f.write_str("groq"),
            Provider::Gemini => f.write_str("gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!(
                "Unknown provider '{}'. Use groq or gemini.",
                other
            )),
        }
    }
}

/// Configuration for the chat client and its retry policy
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Base URL of the chat-completions API (without `/chat/completions`)
    pub base_url: String,

    /// Timeout for individual requests
    ///
    /// Default: 120 seconds (reasoning models answer slowly)
    pub timeout: Duration,

    /// Total attempts per answer, counting the first one
    ///
    /// Default: 3
    pub max_attempts: u32,

    /// Fixed pause between attempts
    ///
    /// Default: 2 seconds
    pub retry_delay: Duration,

    /// Sampling temperature; provider default when `None`
    pub temperature: Option<f32>,

    /// Completion token cap; provider default when `None`
    pub max_tokens: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_provider(Provider::default())
    }
}

impl ClientConfig {
    /// Default attempt budget per answer.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Default pause between attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

    /// Configuration pointing at a provider's endpoint and default model.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            model: provider.default_model().to_string(),
            base_url: provider.base_url().to_string(),
            timeout: Duration::from_secs(120),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget (at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.model, "deepseek-r1-distill-llama-70b");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::for_provider(Provider::Gemini)
            .with_model("gemini-test")
            .with_max_attempts(5)
            .with_retry_delay(Duration::ZERO)
            .with_temperature(0.2)
            .with_max_tokens(512);

        assert_eq!(config.model, "gemini-test");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::ZERO);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(512));
        assert!(config.base_url.contains("generativelanguage"));
    }

    #[test]
    fn test_min_attempts() {
        let config = ClientConfig::default().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let config = ClientConfig::default().with_base_url("http://localhost:8000/v1/");
        assert_eq!(
            config.completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[rstest]
    #[case::groq("groq", Provider::Groq)]
    #[case::gemini("Gemini", Provider::Gemini)]
    #[case::padded(" GROQ ", Provider::Groq)]
    fn test_provider_from_str(#[case] input: &str, #[case] expected: Provider) {
        assert_eq!(input.parse::<Provider>().unwrap(), expected);
    }

    #[test]
    fn test_provider_unknown() {
        assert!("openai".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_env_vars() {
        assert_eq!(Provider::Groq.api_key_env(), "GROQ_API_KEY");
        assert_eq!(Provider::Gemini.api_key_env(), "GEMINI_API_KEY");
    }
}
