//! Session and translation-context lifecycle for BabelBridge.
//!
//! The crate keeps anonymous sessions and per-session translation contexts in
//! memory with lazy, sliding-TTL expiry, and threads an append-only chat
//! history through a pluggable [`ChatBackend`] for multi-turn refinement.
//! Expired context ids are remembered so callers can tell "gone" from
//! "never existed".

pub mod backend;
pub mod clock;
pub mod context_store;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod language;
pub mod prompt;
pub mod service;
pub mod session_store;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{BackendError, CallContext, ChatBackend, SharedBackend};
pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use context_store::{ContextLookup, ContextStore};
pub use conversation::{ChatMessage, ConversationState, Role};
pub use engine::TranslationEngine;
pub use error::{Result, TranslateError};
pub use language::{LanguageTag, LanguageTagError};
pub use service::{ContextId, TranslationService};
pub use session_store::SessionStore;
pub use token::random_token;
