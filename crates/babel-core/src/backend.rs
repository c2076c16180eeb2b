use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::conversation::ChatMessage;
use crate::error::TranslateError;

/// Longest error body kept when a backend answers with a non-success status.
pub const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend rejected request: {0}")]
    Rejected(String),
}

impl BackendError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        BackendError::Status { status, body }
    }
}

/// A chat-completion capability: given the full ordered history, produce the next reply.
///
/// Implementations hold no conversation memory between calls.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn id(&self) -> &'static str;

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;
}

pub type SharedBackend = Arc<dyn ChatBackend>;

/// Cancellation and deadline applied to a single backend call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive `fut` until it finishes, the token is cancelled, or the deadline passes.
    pub(crate) async fn run<F>(&self, fut: F) -> Result<String, TranslateError>
    where
        F: Future<Output = Result<String, BackendError>>,
    {
        let bounded = async {
            match self.deadline {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or(Err(BackendError::Timeout(limit))),
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TranslateError::Cancelled),
            res = bounded => res.map_err(TranslateError::from),
        }
    }
}
