use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::backend::CallContext;
use crate::clock::SharedClock;
use crate::context_store::{ContextLookup, ContextStore};
use crate::conversation::ConversationState;
use crate::engine::TranslationEngine;
use crate::error::{Result, TranslateError};
use crate::language::LanguageTag;
use crate::token::random_token;

pub type ContextId = String;

/// One conversation behind its own lock so improves on the same id run one at a time.
type Slot = Arc<Mutex<ConversationState>>;

/// Facade joining the engine with per-session context bookkeeping.
///
/// Session validity is checked by the caller before anything here runs.
pub struct TranslationService {
    engine: TranslationEngine,
    contexts: ContextStore<Slot>,
}

impl TranslationService {
    pub fn new(engine: TranslationEngine, context_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            engine,
            contexts: ContextStore::new(context_ttl, clock),
        }
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    /// Translate and keep the conversation under a freshly minted id.
    pub async fn start(
        &self,
        session: &str,
        source: &str,
        target: &LanguageTag,
        ctx: &CallContext,
    ) -> Result<(ContextId, String)> {
        let (state, reply) = self.engine.start_translation(source, target, ctx).await?;
        let id = random_token();
        self.contexts
            .put(session, id.clone(), Arc::new(Mutex::new(state)));
        Ok((id, reply))
    }

    /// Extend the conversation behind `id` with `feedback`.
    ///
    /// Concurrent improves on one id are serialized; each sees the history the
    /// previous one committed. The store lock is never held across the backend call.
    pub async fn improve(
        &self,
        session: &str,
        id: &str,
        feedback: &str,
        ctx: &CallContext,
    ) -> Result<String> {
        let slot = self.live_slot(session, id)?;
        let mut state = slot.lock().await;
        let (next, reply) = self.engine.improve(&state, feedback, ctx).await?;
        *state = next;
        drop(state);
        self.contexts.touch(session, id);
        Ok(reply)
    }

    /// One-off translation. Nothing is stored and no id is minted.
    pub async fn preview(
        &self,
        source: &str,
        target: &LanguageTag,
        ctx: &CallContext,
    ) -> Result<String> {
        let (_, reply) = self.engine.start_translation(source, target, ctx).await?;
        Ok(reply)
    }

    pub async fn identify(&self, source: &str, ctx: &CallContext) -> Result<LanguageTag> {
        self.engine.identify_language(source, ctx).await
    }

    /// Snapshot of the stored conversation. Does not renew the context.
    pub async fn history(&self, session: &str, id: &str) -> Result<ConversationState> {
        let slot = self.live_slot(session, id)?;
        let state = slot.lock().await;
        Ok(state.clone())
    }

    pub fn live_contexts(&self, session: &str) -> usize {
        self.contexts.live_count(session)
    }

    fn live_slot(&self, session: &str, id: &str) -> Result<Slot> {
        match self.contexts.lookup(session, id) {
            ContextLookup::Live(slot) => Ok(slot),
            ContextLookup::Expired => Err(TranslateError::ContextExpired),
            ContextLookup::Unknown => Err(TranslateError::ContextUnknown),
        }
    }
}
