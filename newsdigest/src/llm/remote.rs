use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// Requests are bounded by the HTTP client timeout only; wrap the provider in
/// [`super::timeout::TimeoutProvider`] for an overall bound per oracle call.
pub struct RemoteLlmProvider {
    endpoint: String,
    api_key: String,
    model: String,
    http_timeout: Duration,
    max_tokens: usize,
    temperature: f32,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            http_timeout: Duration::from_secs(30),
            max_tokens: 1000,
            temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    /// Fallbacks for requests that leave these unset
    pub fn with_defaults(mut self, http_timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        self.http_timeout = Duration::from_secs(http_timeout_secs);
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_request(&self, request: LlmRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(self.temperature),
            response_format: request.json_reply.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        }
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> anyhow::Error {
    if err.is_timeout() {
        anyhow::anyhow!("LLM request timed out after {:?}", timeout)
    } else {
        anyhow::Error::new(err).context("LLM HTTP request failed")
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.http_timeout);
        let body = self.chat_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, detail);
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e, timeout)
            } else {
                anyhow::Error::new(e).context("Malformed chat completion")
            }
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .context("LLM response has no choices")?;
        if choice.finish_reason.as_deref() == Some("length") {
            warn!("LLM reply hit the token limit; JSON may be incomplete");
        }

        let usage = completion.usage.unwrap_or_default();
        debug!("LLM call used {} tokens", usage.total_tokens);

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: UsageMetadata {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            model: completion.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_only_for_json_prompts() {
        let provider = RemoteLlmProvider::new("http://localhost", "k", "m").with_defaults(5, 200, 0.1);
        let request = |json_reply| LlmRequest {
            prompt: "p".to_string(),
            max_tokens: None,
            temperature: Some(0.9),
            timeout_seconds: None,
            json_reply,
        };

        let body = serde_json::to_value(provider.chat_request(request(true))).expect("serialize");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["messages"][0]["role"], "user");

        let body = serde_json::to_value(provider.chat_request(request(false))).expect("serialize");
        assert!(body.get("response_format").is_none());
    }
}
