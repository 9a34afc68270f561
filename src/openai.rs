//! Minimal OpenAI chat-completions client, used as the text-generation collaborator.
//!
//! Calls are instrumented and log the model, latency and response size (not contents).
//! We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::GenerationError;
use crate::generation::TextGenerator;
use crate::util::trunc_for_log;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const GENERATION_TEMPERATURE: f32 = 0.8;

const CONTENT_SYSTEM: &str = "You write exercises for a language-learning app. \
Follow the requested output format exactly and add nothing else.";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    Self::new(api_key, base_url, model).ok()
  }

  pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, GenerationError> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  pub async fn chat_plain(&self, system: &str, user: &str, temperature: f32) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
    };

    let started = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("drill-engine/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      warn!(target: "generation", status, %message, "OpenAI returned an error status");
      return Err(GenerationError::Http { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = first_content(body);
    info!(target: "generation", elapsed = ?started.elapsed(), reply_len = text.len(), "OpenAI reply");
    if text.is_empty() {
      return Err(GenerationError::EmptyContent);
    }
    Ok(text)
  }
}

#[async_trait]
impl TextGenerator for OpenAI {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
    self.chat_plain(CONTENT_SYSTEM, prompt, GENERATION_TEMPERATURE).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

fn first_content(body: ChatCompletionResponse) -> String {
  body.choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .unwrap_or_default()
    .trim()
    .to_string()
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_body_message_is_extracted() {
    let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Rate limit reached"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn first_choice_content_is_trimmed() {
    let body: ChatCompletionResponse = serde_json::from_str(
      r#"{"choices": [{"message": {"content": "  [1, 2]\n"}}, {"message": {"content": "x"}}]}"#,
    ).unwrap();
    assert_eq!(first_content(body), "[1, 2]");

    let empty: ChatCompletionResponse =
      serde_json::from_str(r#"{"choices": [{"message": {"content": null}}], "usage": {"total_tokens": 3}}"#).unwrap();
    assert_eq!(first_content(empty), "");
  }

  #[test]
  fn request_serializes_as_chat_completion() {
    let req = ChatCompletionRequest {
      model: "m".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hi".into() }],
      temperature: 0.5,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["model"], "m");
    assert_eq!(v["messages"][0]["role"], "user");
    assert_eq!(v["temperature"], 0.5);
  }

  #[test]
  fn trailing_slash_is_dropped_from_base_url() {
    let oa = OpenAI::new("k".into(), "http://localhost:8080/v1/".into(), "m".into()).unwrap();
    assert_eq!(oa.base_url, "http://localhost:8080/v1");
  }
}
