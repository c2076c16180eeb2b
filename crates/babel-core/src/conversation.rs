use serde::{Deserialize, Serialize};

use crate::language::LanguageTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only history of one translation conversation.
///
/// Layout is always `[system, user, assistant]` followed by zero or more
/// `(user feedback, assistant reply)` pairs. Only the engine can build or
/// extend a state, and extending produces a new value rather than mutating
/// the old one, so a failed backend call leaves the previous state intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    target: LanguageTag,
}

impl ConversationState {
    pub(crate) fn from_initial_turn(
        system: ChatMessage,
        input: ChatMessage,
        reply: String,
        target: LanguageTag,
    ) -> Self {
        Self {
            messages: vec![system, input, ChatMessage::assistant(reply)],
            target,
        }
    }

    /// History plus a pending user message, ready to send to a backend.
    pub(crate) fn request_with(&self, message: ChatMessage) -> Vec<ChatMessage> {
        let mut request = Vec::with_capacity(self.messages.len() + 1);
        request.extend_from_slice(&self.messages);
        request.push(message);
        request
    }

    /// Commit a backend reply on top of the request that produced it.
    pub(crate) fn committed(&self, mut request: Vec<ChatMessage>, reply: String) -> Self {
        request.push(ChatMessage::assistant(reply));
        Self {
            messages: request,
            target: self.target.clone(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn target(&self) -> &LanguageTag {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of completed improve rounds on top of the initial translation.
    pub fn improvements(&self) -> usize {
        self.messages.len().saturating_sub(3) / 2
    }

    /// Most recent assistant reply.
    pub fn latest_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}
