use std::time::Duration;

use async_trait::async_trait;
use babel_core::{BackendError, ChatBackend, ChatMessage};
use serde::{Deserialize, Serialize};

use crate::http;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_MODEL: &str = "aya-expanse:8b";

/// Any server speaking the OpenAI chat-completions protocol (Ollama, llama.cpp, OpenAI).
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `http://{host}:{port}/v1`, the base a local server exposes.
pub fn local_base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/v1")
}

impl OpenAiCompatBackend {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http::client(timeout)?,
            url: format!("{}/chat/completions", base_url.trim().trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        tracing::debug!(
            target: "babel::backend",
            url = %self.url,
            model = %self.model,
            messages = messages.len(),
            "openai chat"
        );
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let bytes = http::send(self.id(), request, self.timeout).await?;
        let parsed: CompletionResponse = http::decode(&bytes)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Malformed("response has no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_completions_url() {
        let backend = OpenAiCompatBackend::new(
            &local_base_url(DEFAULT_HOST, DEFAULT_PORT),
            DEFAULT_MODEL,
            Some("  ".into()),
            Duration::from_secs(5),
        )
        .expect("client");
        assert_eq!(backend.url, "http://localhost:11434/v1/chat/completions");
        assert!(backend.api_key.is_none(), "blank keys are dropped");
    }

    #[test]
    fn request_body_uses_lowercase_roles() {
        let messages = [ChatMessage::system("rules"), ChatMessage::user("Hello.")];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
        };
        let json = serde_json::to_value(&body).expect("json");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello.");
    }
}
