use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};
use crate::retry::{RetryPolicy, send_with_retry};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` / `embedContent` backend.
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    embedding_model: Option<String>,
    retry: RetryPolicy,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GeminiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            embedding_model,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<String, LlmError> {
        let response = send_with_retry("gemini", &self.retry, || {
            self.client
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("Gemini API error {status}: {text}");
            return Err(LlmError::from_status("gemini", status));
        }
        Ok(text)
    }
}

impl LlmProvider for GeminiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let (system, contents) = convert_messages(messages);
        let body = GenerateRequest {
            contents,
            system_instruction: system,
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let text = self.post(&url, &body).await?;
        let resp: GenerateResponse = serde_json::from_str(&text)?;

        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .ok_or(LlmError::EmptyResponse {
                provider: "gemini".into(),
            })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::EmbedUnsupported {
                provider: "gemini".into(),
            })?;

        let body = EmbedRequest {
            model: format!("models/{model}"),
            content: ContentOut {
                role: None,
                parts: vec![PartOut { text }],
            },
        };
        let url = format!("{}/models/{model}:embedContent", self.base_url);
        let text = self.post(&url, &body).await?;
        let resp: EmbedResponse = serde_json::from_str(&text)?;

        if resp.embedding.values.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "gemini".into(),
            });
        }
        Ok(resp.embedding.values)
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "gemini"
    }
}

/// Split out system messages into `systemInstruction`; Gemini names the assistant role `model`.
fn convert_messages(messages: &[Message]) -> (Option<ContentOut<'_>>, Vec<ContentOut<'_>>) {
    let system_parts: Vec<PartOut<'_>> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| PartOut { text: &m.content })
        .collect();
    let system = (!system_parts.is_empty()).then_some(ContentOut {
        role: None,
        parts: system_parts,
    });

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| ContentOut {
            role: Some(if m.role == Role::Assistant {
                "model"
            } else {
                "user"
            }),
            parts: vec![PartOut { text: &m.content }],
        })
        .collect();

    (system, contents)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<ContentOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ContentOut<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct ContentOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentIn>,
}

#[derive(Deserialize)]
struct ContentIn {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: ContentOut<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_for(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(
            "test-key".into(),
            server.uri(),
            "gemini-1.5-flash".into(),
            1024,
            Some("text-embedding-004".into()),
        )
        .with_retry(RetryPolicy::none())
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let p = GeminiProvider::new("k".into(), "http://x/v1beta//".into(), "m".into(), 1, None);
        assert_eq!(p.base_url, "http://x/v1beta");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = GeminiProvider::new("secret-key".into(), DEFAULT_BASE_URL.into(), "m".into(), 1, None);
        let debug = format!("{p:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn convert_messages_splits_system() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::new(Role::Assistant, "hi"),
        ];
        let (system, contents) = convert_messages(&messages);
        assert_eq!(system.unwrap().parts[0].text, "be brief");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role, Some("user"));
        assert_eq!(contents[1].role, Some("model"));
    }

    #[test]
    fn generate_request_serializes_camel_case() {
        let messages = vec![Message::user("hi")];
        let (system, contents) = convert_messages(&messages);
        let body = GenerateRequest {
            contents,
            system_instruction: system,
            generation_config: GenerationConfig {
                max_output_tokens: 64,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"generationConfig\":{\"maxOutputTokens\":64}"));
        assert!(!json.contains("systemInstruction"));
    }

    #[test]
    fn supports_embeddings_requires_model() {
        let p = GeminiProvider::new("k".into(), DEFAULT_BASE_URL.into(), "m".into(), 1, None);
        assert!(!p.supports_embeddings());
    }

    #[tokio::test]
    async fn chat_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}}]
            })))
            .mount(&server)
            .await;

        let reply = provider_for(&server)
            .chat(&[Message::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply, "Hello, world");
    }

    #[tokio::test]
    async fn chat_empty_candidates_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .chat(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn chat_rate_limited_maps_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .chat(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn embed_returns_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": {"values": [0.1, 0.2, 0.3]}
            })))
            .mount(&server)
            .await;

        let values = provider_for(&server).embed("summary").await.unwrap();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_without_model_returns_error() {
        let p = GeminiProvider::new("k".into(), DEFAULT_BASE_URL.into(), "m".into(), 1, None);
        let err = p.embed("text").await.unwrap_err();
        assert!(err.to_string().contains("embedding not supported"));
    }
}
