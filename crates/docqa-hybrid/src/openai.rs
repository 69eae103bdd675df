//! Blocking client for OpenAI-compatible `/chat/completions` endpoints.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use docqa_core::config::CompletionConfig;
use docqa_core::{Error, RetryPolicy};

use crate::synthesis::{CompletionModel, Prompt};

const PROVIDER: &str = "openai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiChatModel {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn completion_error(message: impl Into<String>) -> Error {
    Error::Completion { provider: PROVIDER.into(), message: message.into() }
}

impl OpenAiChatModel {
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| completion_error(format!("{} environment variable not set", config.api_key_env)))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(completion_error("API key must not be empty").into());
        }
        let client = reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: config.retry_policy(),
        })
    }

    fn request(&self, prompt: &Prompt) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: &prompt.system },
                Message { role: "user", content: &prompt.user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| completion_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(completion_error(format!("API returned {status}: {detail}")).into());
        }
        let parsed: ChatResponse =
            response.json().map_err(|e| completion_error(format!("failed to parse response: {e}")))?;
        first_choice(parsed)
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| completion_error("response contained no message content").into())
}

impl CompletionModel for OpenAiChatModel {
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_chars = prompt.user.len(), "requesting completion");
        self.retry.run("chat completion", |_| self.request(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Yes [Source 1]."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_choice(parsed).unwrap(), "Yes [Source 1].");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_choice(parsed).is_err());
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: [Message { role: "system", content: "s" }, Message { role: "user", content: "u" }],
            temperature: 0.1,
            max_tokens: 1000,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["max_tokens"], 1000);
    }
}
