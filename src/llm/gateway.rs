//! `LanguageModelGateway` trait and the `ApiGateway` implementation.
//!
//! `ApiGateway` calls any OpenAI-compatible endpoint (OpenAI, Ollama
//! in OpenAI mode, Groq, LM Studio, vLLM) for both chat completions
//! (`/v1/chat/completions`) and embeddings (`/v1/embeddings`).
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{LlmConfig, LlmProvider};

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the language model service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("language model request timed out")]
    Timeout,

    /// The service answered with a non-success status (auth, quota, …).
    #[error("language model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse language model response: {0}")]
    Parse(String),

    /// The service returned no usable content.
    #[error("language model returned an empty response")]
    EmptyResponse,

    /// The gateway is switched off in the configuration.
    #[error("language model gateway is disabled")]
    Disabled,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// LanguageModelGateway trait
// ---------------------------------------------------------------------------

/// The two language-model operations the dialogue depends on.
///
/// Injected into the runner and the ranker as `Arc<dyn LanguageModelGateway>`
/// so tests can substitute scripted doubles.
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Free-text completion for a system/user prompt pair.
    async fn complete(&self, system: &str, user: &str) -> Result<String, GatewayError>;

    /// Embedding vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError>;
}

// ---------------------------------------------------------------------------
// ApiGateway
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible REST API.
///
/// The `Authorization: Bearer …` header is attached only when an API key is
/// configured (or found in `OPENAI_API_KEY`). Ollama and other
/// local providers need none, and Ollama is never sent the environment key.
pub struct ApiGateway {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl ApiGateway {
    /// Build an `ApiGateway` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`. A default client is used if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key: config.resolved_api_key(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_enabled(&self) -> Result<(), GatewayError> {
        if self.config.provider == LlmProvider::Disabled {
            return Err(GatewayError::Disabled);
        }
        Ok(())
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let mut req = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

/// Pull the first choice's message text out of a chat-completions response.
pub(crate) fn extract_completion(json: &serde_json::Value) -> Result<String, GatewayError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(GatewayError::EmptyResponse)?
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(text)
}

/// Pull the first embedding vector out of an embeddings response.
pub(crate) fn extract_embedding(json: &serde_json::Value) -> Result<Vec<f32>, GatewayError> {
    let values = json["data"][0]["embedding"]
        .as_array()
        .ok_or(GatewayError::EmptyResponse)?;

    let vector = values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| GatewayError::Parse(format!("non-numeric embedding component: {v}")))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if vector.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(vector)
}

#[async_trait]
impl LanguageModelGateway for ApiGateway {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GatewayError> {
        self.ensure_enabled()?;

        let body = serde_json::json!({
            "model":       self.config.chat_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream":      false,
            "temperature": self.config.temperature
        });

        log::debug!("gateway: chat completion ({} prompt chars)", user.len());
        let json = self.post_json(&self.endpoint("chat/completions"), body).await?;
        extract_completion(&json)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        self.ensure_enabled()?;

        let body = serde_json::json!({
            "model": self.config.embedding_model,
            "input": text
        });

        log::debug!("gateway: embedding ({} chars)", text.len());
        let json = self.post_json(&self.endpoint("embeddings"), body).await?;
        extract_embedding(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(|s| s.to_string()),
            base_url: "http://localhost:11434/".into(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _gateway = ApiGateway::from_config(&make_config(None));
        let _gateway = ApiGateway::from_config(&make_config(Some("sk-test-1234")));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let gateway = ApiGateway::from_config(&make_config(None));
        assert_eq!(
            gateway.endpoint("embeddings"),
            "http://localhost:11434/v1/embeddings"
        );
    }

    #[test]
    fn gateway_is_object_safe() {
        let gateway: Box<dyn LanguageModelGateway> =
            Box::new(ApiGateway::from_config(&make_config(None)));
        drop(gateway);
    }

    #[tokio::test]
    async fn disabled_provider_fails_without_network() {
        let mut config = make_config(None);
        config.provider = LlmProvider::Disabled;
        let gateway = ApiGateway::from_config(&config);

        assert!(matches!(
            gateway.complete("sys", "user").await,
            Err(GatewayError::Disabled)
        ));
        assert!(matches!(gateway.embed("text").await, Err(GatewayError::Disabled)));
    }

    #[test]
    fn extracts_trimmed_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "  Is it a river fish?\n" } }]
        });
        assert_eq!(extract_completion(&json).unwrap(), "Is it a river fish?");
    }

    #[test]
    fn blank_completion_is_empty_response() {
        let json = serde_json::json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(matches!(extract_completion(&json), Err(GatewayError::EmptyResponse)));
        assert!(matches!(
            extract_completion(&serde_json::json!({})),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[test]
    fn extracts_embedding_vector() {
        let json = serde_json::json!({ "data": [{ "embedding": [0.5, -1.0, 2] }] });
        assert_eq!(extract_embedding(&json).unwrap(), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn non_numeric_embedding_is_parse_error() {
        let json = serde_json::json!({ "data": [{ "embedding": [0.5, "x"] }] });
        assert!(matches!(extract_embedding(&json), Err(GatewayError::Parse(_))));
    }
}
