//! Chat-completion backends for BabelBridge.
//!
//! Each backend implements [`babel_core::ChatBackend`]; [`BackendConfig`] picks
//! one from the environment.

pub mod cohere;
pub mod config;
mod http;
pub mod mock;
pub mod openai;

pub use cohere::CohereBackend;
pub use config::{BackendConfig, BackendConfigError, BackendKind, CohereSettings, OpenAiSettings};
pub use mock::MockBackend;
pub use openai::OpenAiCompatBackend;
