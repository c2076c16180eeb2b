use crate::backend::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not interpret backend reply {reply:?}: {reason}")]
    Parse { reply: String, reason: String },
    /// The identifier was never issued to this session.
    #[error("context not found")]
    ContextUnknown,
    /// The identifier was issued to this session but its TTL lapsed.
    #[error("context expired")]
    ContextExpired,
    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;
