use std::time::Duration;

use async_trait::async_trait;
use babel_core::{BackendError, ChatBackend, ChatMessage, Role};
use serde::{Deserialize, Serialize};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_MODEL: &str = "c4ai-aya-expanse-8b";

/// Cohere's hosted chat API.
pub struct CohereBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize, PartialEq)]
struct CohereTurn {
    role: &'static str,
    message: String,
}

#[derive(Debug, Serialize, Default)]
struct CohereRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<String>,
    chat_history: Vec<CohereTurn>,
    message: String,
}

#[derive(Deserialize)]
struct CohereResponse {
    text: Option<String>,
}

impl CohereRequest {
    /// The system message becomes the preamble, the final user turn the message,
    /// and everything in between the chat history.
    fn from_messages(model: &str, messages: &[ChatMessage]) -> Self {
        let mut req = CohereRequest {
            model: model.to_string(),
            ..Default::default()
        };
        let last = messages.len().saturating_sub(1);
        for (idx, msg) in messages.iter().enumerate() {
            match msg.role {
                Role::System => req.preamble = Some(msg.content.clone()),
                Role::User if idx == last => req.message = msg.content.clone(),
                Role::User => req.chat_history.push(CohereTurn {
                    role: "USER",
                    message: msg.content.clone(),
                }),
                Role::Assistant => req.chat_history.push(CohereTurn {
                    role: "CHATBOT",
                    message: msg.content.clone(),
                }),
            }
        }
        req
    }
}

impl CohereBackend {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http::client(timeout)?,
            url: format!("{}/v1/chat", base_url.trim().trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ChatBackend for CohereBackend {
    fn id(&self) -> &'static str {
        "cohere"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        if !matches!(messages.last(), Some(m) if m.role == Role::User) {
            return Err(BackendError::Rejected(
                "last message must be a user turn".into(),
            ));
        }
        tracing::debug!(
            target: "babel::backend",
            model = %self.model,
            messages = messages.len(),
            "cohere chat"
        );
        let body = CohereRequest::from_messages(&self.model, messages);
        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let bytes = http::send(self.id(), request, self.timeout).await?;
        let parsed: CohereResponse = http::decode(&bytes)?;
        parsed
            .text
            .ok_or_else(|| BackendError::Malformed("response has no text".into()))
    }
}
