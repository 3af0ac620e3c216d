use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::{LlmClient, SamplingParams};
use crate::config::missing_key_message;
use crate::error::GenerationError;
use crate::util::SecretString;

fn build_http_client(timeout_secs: u64) -> Result<Client, GenerationError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Missing credential check shared by every provider.
fn require_key<'a>(
    api_key: &'a Option<SecretString>,
    env_var: &str,
) -> Result<&'a SecretString, GenerationError> {
    api_key
        .as_ref()
        .ok_or_else(|| GenerationError::Configuration(missing_key_message(env_var)))
}

/// Turn a non-success response into `Upstream`, keeping the oracle's body for diagnostics.
async fn upstream_failure(response: Response) -> GenerationError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    GenerationError::upstream(Some(status.as_u16()), &body)
}

fn transport_failure(provider: &str, err: reqwest::Error) -> GenerationError {
    let status = err.status().map(|s| s.as_u16());
    let details = if err.is_timeout() {
        format!("{} request timed out", provider)
    } else {
        format!("failed to send request to {}: {}", provider, err)
    };
    GenerationError::Upstream {
        status,
        details: serde_json::Value::String(details),
    }
}

// ============================================================================
// Gemini Client (Google Generative AI)
// ============================================================================

pub struct GeminiClient {
    api_key: Option<SecretString>,
    api_key_env: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&SamplingParams> for GeminiGenerationConfig {
    fn from(p: &SamplingParams) -> Self {
        Self {
            temperature: p.temperature,
            top_k: p.top_k,
            top_p: p.top_p,
            max_output_tokens: p.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<SecretString>,
        api_key_env: String,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            api_key,
            api_key_env,
            model,
            base_url,
            client: build_http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        let api_key = require_key(&self.api_key, &self.api_key_env)?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: sampling.into(),
        };

        debug!("Calling Gemini API with model: {}", self.model);

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_failure("Gemini API", e))?;

        if !response.status().is_success() {
            return Err(upstream_failure(response).await);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_failure("Gemini API", e))?;
        let api_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|_| GenerationError::upstream(Some(status), &body))?;

        api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| GenerationError::upstream(Some(status), &body))
    }
}

// ============================================================================
// OpenAI Client (also serves OpenAI-compatible gateways and local servers)
// ============================================================================

pub struct OpenAIClient {
    api_key: Option<SecretString>,
    api_key_env: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIClient {
    pub fn new(
        api_key: Option<SecretString>,
        api_key_env: String,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            api_key,
            api_key_env,
            model,
            base_url,
            client: build_http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        let api_key = require_key(&self.api_key, &self.api_key_env)?;

        // top_k has no counterpart in the chat completions API
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_output_tokens,
        };

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, self.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request);

        // Only add authorization if API key is not empty
        if !api_key.is_empty() {
            req = req.header("authorization", format!("Bearer {}", api_key.expose()));
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_failure("OpenAI API", e))?;

        if !response.status().is_success() {
            return Err(upstream_failure(response).await);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_failure("OpenAI API", e))?;
        let api_response: OpenAIResponse = serde_json::from_str(&body)
            .map_err(|_| GenerationError::upstream(Some(status), &body))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::upstream(Some(status), &body))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini(base_url: &str, key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            key.map(|k| SecretString::new(k.to_string())),
            "GEMINI_API_KEY".to_string(),
            "gemini-1.5-pro".to_string(),
            base_url.to_string(),
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_gemini_client_creation() {
        let client = gemini("https://example.invalid/v1beta", Some("test_key"));
        assert_eq!(client.api_key.as_ref().unwrap().expose(), "test_key");
        assert_eq!(client.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_generation_config_is_camel_case() {
        let config: GeminiGenerationConfig = (&SamplingParams {
            temperature: 0.9,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        })
            .into();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["topK"], 40);
        assert_eq!(value["maxOutputTokens"], 1024);
        assert!(value.get("max_output_tokens").is_none());
    }

    #[tokio::test]
    async fn test_gemini_missing_key_is_configuration_error() {
        // No server needed: the key check happens before any request is built
        let client = gemini("http://127.0.0.1:1", None);
        let err = client
            .complete("hi", &SamplingParams::default())
            .await
            .unwrap_err();
        match err {
            GenerationError::Configuration(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gemini_request_structure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-pro:generateContent")
            .match_header("x-goog-api-key", "test_key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"topK": 40, "maxOutputTokens": 2048}
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"world"}]}}]}"#)
            .create_async()
            .await;

        let client = gemini(&server.url(), Some("test_key"));
        let out = client
            .complete("hello", &SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(out, "world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gemini_non_success_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-pro:generateContent")
            .with_status(503)
            .with_body(r#"{"error":{"code":503,"message":"overloaded"}}"#)
            .create_async()
            .await;

        let client = gemini(&server.url(), Some("test_key"));
        let err = client
            .complete("hello", &SamplingParams::default())
            .await
            .unwrap_err();
        match err {
            GenerationError::Upstream { status, details } => {
                assert_eq!(status, Some(503));
                assert_eq!(details["error"]["message"], "overloaded");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let client = gemini(&server.url(), Some("test_key"));
        let err = client
            .complete("hello", &SamplingParams::default())
            .await
            .unwrap_err();
        match err {
            GenerationError::Upstream { status, details } => {
                assert_eq!(status, Some(200));
                assert_eq!(details["promptFeedback"]["blockReason"], "SAFETY");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_request_structure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1024
            })))
            .with_status(200)
            .with_body(r##"{"choices":[{"message":{"role":"assistant","content":"[\"#a\"]"}}]}"##)
            .create_async()
            .await;

        let client = OpenAIClient::new(
            Some(SecretString::new("sk-test".to_string())),
            "OPENAI_API_KEY".to_string(),
            "gpt-4o-mini".to_string(),
            server.url(),
            5,
        )
        .unwrap();
        let sampling = SamplingParams {
            max_output_tokens: 1024,
            ..SamplingParams::default()
        };
        let out = client.complete("tags please", &sampling).await.unwrap();
        assert_eq!(out, r##"["#a"]"##);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_keyless_omits_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new(
            Some(SecretString::new(String::new())),
            "OPENAI_API_KEY".to_string(),
            "llama3".to_string(),
            server.url(),
            5,
        )
        .unwrap();
        let out = client
            .complete("hi", &SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(out, "ok");
        mock.assert_async().await;
    }
}
