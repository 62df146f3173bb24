//! OpenAI Chat Completions client.
//!
//! Keeps the API key on the server side: callers hand over messages and get
//! back the first choice's text.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub role:    String,
  pub content: String,
}

impl Message {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: "system".to_owned(), content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: "user".to_owned(), content: content.into() }
  }
}

/// Per-request sampling options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
  pub temperature:   f32,
  pub max_tokens:    u32,
  /// Ask for `response_format: {"type": "json_object"}`.
  pub json_response: bool,
}

impl Default for ChatOptions {
  fn default() -> Self {
    Self { temperature: 0.3, max_tokens: 1500, json_response: false }
  }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        &'a [Message],
  temperature:     f32,
  max_tokens:      u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

/// Async client for `POST {base_url}/chat/completions`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
  http:     Client,
  api_key:  String,
  base_url: String,
  model:    String,
}

impl OpenAiClient {
  pub fn new(
    api_key: impl Into<String>,
    model: impl Into<String>,
    base_url: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let api_key = api_key.into();
    if api_key.trim().is_empty() {
      return Err(Error::MissingApiKey);
    }

    let http = Client::builder()
      .timeout(timeout)
      .user_agent(concat!("rubriq/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| Error::Transport(e.to_string()))?;

    Ok(Self {
      http,
      api_key,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      model: model.into(),
    })
  }

  pub fn model(&self) -> &str { &self.model }

  /// Send a chat completion and return the first choice's message content.
  pub async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<String> {
    let request = ChatRequest {
      model: &self.model,
      messages,
      temperature: options.temperature,
      max_tokens: options.max_tokens,
      response_format: options
        .json_response
        .then_some(ResponseFormat { kind: "json_object" }),
    };

    let res = self
      .http
      .post(format!("{}/chat/completions", self.base_url))
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?;

    match res.status() {
      s if s.is_success() => {}
      StatusCode::UNAUTHORIZED => return Err(Error::InvalidApiKey),
      StatusCode::TOO_MANY_REQUESTS => return Err(Error::RateLimited),
      s => {
        let status = s.as_u16();
        let body = res.text().await.unwrap_or_default();
        tracing::warn!(status, body = %body, "chat completion failed");
        return Err(Error::Http { status, body });
      }
    }

    let body = res.text().await?;
    let response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
      Error::MalformedResponse(format!(
        "{e} (response preview: {})",
        body.chars().take(200).collect::<String>()
      ))
    })?;

    let content = response
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();

    if content.trim().is_empty() {
      return Err(Error::EmptyResponse);
    }
    Ok(content)
  }
}

/// Pull JSON out of text that may wrap it in a markdown code fence.
pub fn extract_json(text: &str) -> &str {
  let text = text.trim();

  if let Some(start) = text.find("```json") {
    let content_start = start + 7;
    if let Some(end) = text[content_start..].find("```") {
      return text[content_start..content_start + end].trim();
    }
  }

  if let Some(start) = text.find("```") {
    let content_start = start + 3;
    // Skip a language tag on the fence line.
    let content_start = text[content_start..]
      .find('\n')
      .map(|i| content_start + i + 1)
      .unwrap_or(content_start);
    if let Some(end) = text[content_start..].find("```") {
      return text[content_start..content_start + end].trim();
    }
  }

  text
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::post,
  };
  use serde_json::{Value, json};

  use super::*;

  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/v1")
  }

  fn client(base_url: &str) -> OpenAiClient {
    OpenAiClient::new("sk-test", "gpt-test", base_url, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn extract_json_plain() {
    assert_eq!(extract_json(r#"  {"key": "value"} "#), r#"{"key": "value"}"#);
  }

  #[test]
  fn extract_json_fenced() {
    let input = "Here you go:\n```json\n{\"key\": \"value\"}\n```\nThanks";
    assert_eq!(extract_json(input), r#"{"key": "value"}"#);

    let input = "```\n{\"key\": \"value\"}\n```";
    assert_eq!(extract_json(input), r#"{"key": "value"}"#);
  }

  #[test]
  fn blank_api_key_is_rejected() {
    let err = OpenAiClient::new("  ", DEFAULT_MODEL, DEFAULT_BASE_URL, Duration::from_secs(5))
      .unwrap_err();
    assert!(matches!(err, Error::MissingApiKey));
  }

  #[tokio::test]
  async fn sends_bearer_auth_and_returns_first_choice() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|headers: HeaderMap, Json(body): Json<Value>| async move {
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][1]["content"], "Grade this");
        assert_eq!(body["response_format"]["type"], "json_object");
        Json(json!({
          "choices": [
            { "message": { "role": "assistant", "content": "{\"summary\": \"ok\"}" } },
            { "message": { "role": "assistant", "content": "ignored" } }
          ]
        }))
      }),
    );
    let base = serve(router).await;

    let messages = [Message::system("You grade essays"), Message::user("Grade this")];
    let options = ChatOptions { json_response: true, ..ChatOptions::default() };
    let text = client(&base).chat(&messages, options).await.unwrap();
    assert_eq!(text, "{\"summary\": \"ok\"}");
  }

  #[tokio::test]
  async fn prose_requests_omit_response_format() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|Json(body): Json<Value>| async move {
        assert!(body.get("response_format").is_none());
        Json(json!({ "choices": [{ "message": { "content": "Strengths: clear" } }] }))
      }),
    );
    let base = serve(router).await;
    let text = client(&base)
      .chat(&[Message::user("hi")], ChatOptions::default())
      .await
      .unwrap();
    assert_eq!(text, "Strengths: clear");
  }

  #[tokio::test]
  async fn maps_error_statuses() {
    let router = Router::new()
      .route(
        "/limited/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
      )
      .route(
        "/denied/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
      )
      .route(
        "/broken/chat/completions",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
      )
      .route(
        "/empty/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
      )
      .route(
        "/garbled/chat/completions",
        post(|| async { "not json" }),
      );
    let base = serve(router).await;
    let root = base.trim_end_matches("/v1");
    let ask = |path: &'static str| {
      let c = client(&format!("{root}/{path}"));
      async move { c.chat(&[Message::user("hi")], ChatOptions::default()).await }
    };

    assert!(matches!(ask("limited").await, Err(Error::RateLimited)));
    assert!(matches!(ask("denied").await, Err(Error::InvalidApiKey)));
    match ask("broken").await {
      Err(Error::Http { status, body }) => {
        assert_eq!(status, 502);
        assert_eq!(body, "upstream down");
      }
      other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(ask("empty").await, Err(Error::EmptyResponse)));
    assert!(matches!(ask("garbled").await, Err(Error::MalformedResponse(_))));
  }

  #[test]
  fn transient_errors() {
    assert!(Error::RateLimited.is_transient());
    assert!(Error::Http { status: 503, body: String::new() }.is_transient());
    assert!(!Error::InvalidApiKey.is_transient());
  }
}
