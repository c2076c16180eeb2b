use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{BackendError, ChatBackend};
use crate::clock::ManualClock;
use crate::conversation::ChatMessage;

/// Backend double that plays back queued replies and records every request.
///
/// Once the queue runs dry it answers `reply {n}` where `n` counts calls so far.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
    advance: Option<(ManualClock, Duration)>,
}

impl ScriptedBackend {
    pub(crate) fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Move `clock` forward by `by` during every call, as a slow backend would.
    pub(crate) fn advancing(mut self, clock: ManualClock, by: Duration) -> Self {
        self.advance = Some((clock, by));
        self
    }

    pub(crate) fn fail_next(&self, err: BackendError) {
        self.replies.lock().push_front(Err(err));
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl ChatBackend for ScriptedBackend {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let next = {
            let mut requests = self.requests.lock();
            requests.push(messages.to_vec());
            let call = requests.len();
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("reply {call}")))
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((clock, by)) = &self.advance {
            clock.advance(*by);
        }
        next
    }
}
