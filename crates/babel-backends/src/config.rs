use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use babel_core::SharedBackend;

use crate::cohere::{self, CohereBackend};
use crate::mock::MockBackend;
use crate::openai::{self, OpenAiCompatBackend};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum BackendConfigError {
    #[error("ENGINE must be set to one of: mock, openai, cohere")]
    MissingEngine,
    #[error("unknown ENGINE {0:?} (expected mock, openai or cohere)")]
    UnknownEngine(String),
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("COHERE_API_KEY is required when ENGINE=cohere")]
    MissingCohereKey,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Mock,
    OpenAi,
    Cohere,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Mock => "mock",
            BackendKind::OpenAi => "openai",
            BackendKind::Cohere => "cohere",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(BackendKind::Mock),
            "openai" => Ok(BackendKind::OpenAi),
            "cohere" => Ok(BackendKind::Cohere),
            other => Err(BackendConfigError::UnknownEngine(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohereSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

/// Which backend to run and the settings it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Mock { delay: Duration },
    OpenAi(OpenAiSettings),
    Cohere(CohereSettings),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BackendConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, BackendConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackendConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let kind: BackendKind = get("ENGINE")
            .ok_or(BackendConfigError::MissingEngine)?
            .parse()?;
        match kind {
            BackendKind::Mock => {
                let delay = match get("MOCK_DELAY_MS") {
                    Some(raw) => raw.parse::<u64>().map_err(|_| BackendConfigError::Invalid {
                        key: "MOCK_DELAY_MS",
                        expected: "a whole number of milliseconds",
                        value: raw,
                    })?,
                    None => 0,
                };
                Ok(BackendConfig::Mock {
                    delay: Duration::from_millis(delay),
                })
            }
            BackendKind::OpenAi => {
                let base_url = match get("OPENAI_BASE_URL") {
                    Some(url) => url,
                    None => {
                        let host =
                            get("OPENAI_HOST").unwrap_or_else(|| openai::DEFAULT_HOST.into());
                        let port = match get("OPENAI_PORT") {
                            Some(raw) => {
                                raw.parse::<u16>().map_err(|_| BackendConfigError::Invalid {
                                    key: "OPENAI_PORT",
                                    expected: "a TCP port",
                                    value: raw,
                                })?
                            }
                            None => openai::DEFAULT_PORT,
                        };
                        openai::local_base_url(&host, port)
                    }
                };
                Ok(BackendConfig::OpenAi(OpenAiSettings {
                    base_url,
                    model: get("OPENAI_MODEL").unwrap_or_else(|| openai::DEFAULT_MODEL.into()),
                    api_key: get("OPENAI_API_KEY"),
                }))
            }
            BackendKind::Cohere => Ok(BackendConfig::Cohere(CohereSettings {
                base_url: get("COHERE_BASE_URL")
                    .unwrap_or_else(|| cohere::DEFAULT_BASE_URL.into()),
                model: get("COHERE_MODEL").unwrap_or_else(|| cohere::DEFAULT_MODEL.into()),
                api_key: get("COHERE_API_KEY").ok_or(BackendConfigError::MissingCohereKey)?,
            })),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Mock { .. } => BackendKind::Mock,
            BackendConfig::OpenAi(_) => BackendKind::OpenAi,
            BackendConfig::Cohere(_) => BackendKind::Cohere,
        }
    }

    /// Instantiate the configured backend. `timeout` bounds each HTTP request.
    pub fn build(&self, timeout: Duration) -> Result<SharedBackend, BackendConfigError> {
        let backend: SharedBackend = match self {
            BackendConfig::Mock { delay } => Arc::new(MockBackend::with_delay(*delay)),
            BackendConfig::OpenAi(s) => Arc::new(OpenAiCompatBackend::new(
                &s.base_url,
                s.model.clone(),
                s.api_key.clone(),
                timeout,
            )?),
            BackendConfig::Cohere(s) => Arc::new(CohereBackend::new(
                &s.base_url,
                s.model.clone(),
                s.api_key.clone(),
                timeout,
            )?),
        };
        tracing::info!(target: "babel::backend", engine = backend.id(), "chat backend ready");
        Ok(backend)
    }
}
