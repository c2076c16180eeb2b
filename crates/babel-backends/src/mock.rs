use std::time::Duration;

use async_trait::async_trait;
use babel_core::prompt::IDENTIFY_SYSTEM_PROMPT;
use babel_core::{BackendError, ChatBackend, ChatMessage, Role};

/// Canned replies per target language, indexed by improve round.
const SCRIPTS: &[(&str, [&str; 4])] = &[
    (
        "Japanese",
        [
            "こにちは。ピザがすきです。",
            "こんにちは。ピザが大好きです。",
            "こんにちは。トマトとチーズが入っているので、ピザが大好きです。",
            "やあ、友よ！ピザって最高だよね！",
        ],
    ),
    (
        "Spanish",
        [
            "Hola. Me gusta la pizza.",
            "Hola. Me encanta la pizza.",
            "Hola. Me encanta la pizza porque tiene tomate y queso.",
            "¡Hola amigo! ¡La pizza es lo mejor!",
        ],
    ),
    (
        "German",
        [
            "Hallo. Ich mag Pizza.",
            "Hallo. Ich liebe Pizza.",
            "Hallo. Ich liebe Pizza, weil sie Tomaten und Käse enthält.",
            "Hallo Freund! Pizza ist das Beste!",
        ],
    ),
];

const IDENTIFIED: &[(&str, &str)] = &[
    ("Hello.", "en-US"),
    ("こんにちは。", "ja-JP"),
    ("Hola.", "es-ES"),
    ("Hallo.", "de-DE"),
];

/// Deterministic backend for tests and offline demos.
///
/// Replies depend only on the system prompt and the number of messages sent, so
/// a fixed sequence of start and improve calls always produces the same text.
#[derive(Debug, Default, Clone)]
pub struct MockBackend {
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: (!delay.is_zero()).then_some(delay),
        }
    }

    fn reply(messages: &[ChatMessage]) -> Result<String, BackendError> {
        let system = match messages.first() {
            Some(m) if m.role == Role::System => m.content.as_str(),
            _ => return Err(BackendError::Rejected("missing system message".into())),
        };
        if system.contains(IDENTIFY_SYSTEM_PROMPT) {
            let sample = messages.get(1).map(|m| m.content.as_str()).unwrap_or("");
            let tag = IDENTIFIED
                .iter()
                .find(|(needle, _)| sample.contains(needle))
                .map_or("en-US", |(_, tag)| *tag);
            return Ok(tag.to_string());
        }
        let round = match messages.len() {
            2 => Some(0),
            4 => Some(1),
            6 => Some(2),
            8 => Some(3),
            _ => None,
        };
        SCRIPTS
            .iter()
            .find(|(lang, _)| system.contains(lang))
            .zip(round)
            .map(|((_, replies), idx)| replies[idx].to_string())
            .ok_or_else(|| {
                BackendError::Rejected(format!(
                    "unexpected request with {} messages",
                    messages.len()
                ))
            })
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Self::reply(messages)
    }
}
