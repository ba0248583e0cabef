//! LLM adapter for summary generation.
//!
//! Supports Gemini, OpenAI and Anthropic APIs, selected via environment
//! variables. Each call is a single attempt bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use insight_core::LlmSettings;

use crate::error::{AgentError, AgentResult};
use crate::insight::TextGenerator;

/// Environment variable overriding the provider's default model.
pub const MODEL_ENV: &str = "INSIGHTFLOW_LLM_MODEL";

const MAX_TOKENS: u32 = 512;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    /// Credential variable for this provider.
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAI => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, settings: &LlmSettings) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AgentError::external(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            api_key,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            base_url: provider.default_base_url().to_string(),
            client,
        })
    }

    /// Create an LLM adapter from environment variables
    ///
    /// Checks in order:
    /// 1. GEMINI_API_KEY
    /// 2. OPENAI_API_KEY
    /// 3. ANTHROPIC_API_KEY
    pub fn from_env(settings: &LlmSettings) -> AgentResult<Self> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        settings: &LlmSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AgentResult<Self> {
        let mut settings = settings.clone();
        if settings.model.is_none() {
            settings.model = lookup(MODEL_ENV).filter(|m| !m.is_empty());
        }

        for provider in [LlmProvider::Gemini, LlmProvider::OpenAI, LlmProvider::Anthropic] {
            if let Some(api_key) = lookup(provider.env_key()).filter(|k| !k.is_empty()) {
                return Self::new(provider, api_key, &settings);
            }
        }

        Err(AgentError::external("no text generation credentials configured"))
    }

    /// Point the adapter at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single prompt and return the generated text.
    pub async fn complete(&self, prompt: &str) -> AgentResult<String> {
        debug!("Requesting summary from {:?} ({})", self.provider, self.model);
        match self.provider {
            LlmProvider::Gemini => self.complete_gemini(prompt).await,
            LlmProvider::OpenAI => self.complete_openai(prompt).await,
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await,
        }
    }

    async fn complete_gemini(&self, prompt: &str) -> AgentResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: MAX_TOKENS,
            },
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::external(format!("Network error: {}", e)))?;

        let result: GeminiResponse = parse_response(response, "Gemini").await?;
        result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AgentError::external("No response from Gemini"))
    }

    async fn complete_openai(&self, prompt: &str) -> AgentResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_completion_tokens: Some(MAX_TOKENS),
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::external(format!("Network error: {}", e)))?;

        let result: OpenAIResponse = parse_response(response, "OpenAI").await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::external("No response from OpenAI"))
    }

    async fn complete_anthropic(&self, prompt: &str) -> AgentResult<String> {
        let url = format!("{}/v1/messages", self.base_url);

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::external(format!("Network error: {}", e)))?;

        let result: AnthropicResponse = parse_response(response, "Anthropic").await?;
        result
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AgentError::external("No response from Anthropic"))
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    provider: &str,
) -> AgentResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::external(format!(
            "{} API error {}: {}",
            provider, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AgentError::external(format!("Failed to parse response: {}", e)))
}

#[async_trait]
impl TextGenerator for LlmAdapter {
    async fn generate(&self, prompt: &str) -> AgentResult<String> {
        self.complete(prompt).await
    }
}

impl std::fmt::Debug for LlmAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAdapter")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_no_credentials() {
        let result = LlmAdapter::from_lookup(&LlmSettings::default(), lookup(&[]));
        assert!(matches!(result, Err(AgentError::ExternalCall(_))));

        let result =
            LlmAdapter::from_lookup(&LlmSettings::default(), lookup(&[("OPENAI_API_KEY", "")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_precedence() {
        let adapter = LlmAdapter::from_lookup(
            &LlmSettings::default(),
            lookup(&[("ANTHROPIC_API_KEY", "a"), ("GEMINI_API_KEY", "g")]),
        )
        .unwrap();
        assert_eq!(adapter.provider(), LlmProvider::Gemini);
        assert_eq!(adapter.model(), LlmProvider::Gemini.default_model());

        let adapter = LlmAdapter::from_lookup(
            &LlmSettings::default(),
            lookup(&[("ANTHROPIC_API_KEY", "a"), ("OPENAI_API_KEY", "o")]),
        )
        .unwrap();
        assert_eq!(adapter.provider(), LlmProvider::OpenAI);
    }

    #[test]
    fn test_model_override() {
        let vars = [("OPENAI_API_KEY", "o"), (MODEL_ENV, "from-env")];

        let adapter = LlmAdapter::from_lookup(&LlmSettings::default(), lookup(&vars)).unwrap();
        assert_eq!(adapter.model(), "from-env");

        let settings = LlmSettings {
            model: Some("from-config".to_string()),
            ..LlmSettings::default()
        };
        let adapter = LlmAdapter::from_lookup(&settings, lookup(&vars)).unwrap();
        assert_eq!(adapter.model(), "from-config");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_external_call_error() {
        let settings = LlmSettings {
            model: None,
            timeout_secs: 2,
        };
        let adapter = LlmAdapter::new(LlmProvider::OpenAI, "key".to_string(), &settings)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");

        let err = adapter.generate("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ExternalCall(ref msg) if msg.contains("Network error")));
    }
}
