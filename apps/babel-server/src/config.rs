use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use babel_backends::{BackendConfig, BackendConfigError};
use rand::RngCore;

pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub(crate) const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 60;
pub(crate) const DEFAULT_MAX_CONC: usize = 1024;
pub(crate) const DEFAULT_FRONTEND_DIR: &str = "frontend/dist";
const SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file key {0} must be a string, integer or boolean")]
    UnsupportedValue(String),
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error(transparent)]
    Backend(#[from] BackendConfigError),
}

/// Settings layered from an optional TOML file with the environment on top.
///
/// File keys use the environment variable names; lowercase keys are accepted.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConfigSource {
    file: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl ConfigSource {
    /// Process environment plus the file named by `BABEL_CONFIG`, if any.
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let file = match env.get("BABEL_CONFIG").filter(|p| !p.trim().is_empty()) {
            Some(path) => read_file(Path::new(path.trim()))?,
            None => HashMap::new(),
        };
        Ok(Self { file, env })
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(env: &[(&str, &str)]) -> Self {
        Self {
            file: HashMap::new(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .or_else(|| self.file.get(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|raw| raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }))
            .transpose()
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }
}

fn read_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = raw.parse().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    table
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => return Err(ConfigError::UnsupportedValue(key)),
            };
            Ok((key.to_ascii_uppercase(), text))
        })
        .collect()
}

/// Cookie signing key and whether it was generated for this process only.
#[derive(Clone)]
pub(crate) struct SecretKey {
    pub bytes: Vec<u8>,
    pub generated: bool,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddr,
    pub concurrency_limit: usize,
    pub backend: BackendConfig,
    pub backend_timeout: Duration,
    pub session_ttl: Duration,
    pub context_ttl: Duration,
    pub secret: SecretKey,
    pub rate_limiting: bool,
    pub cookie_secure: bool,
    pub frontend_dir: PathBuf,
}

impl ServerConfig {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ConfigSource::load()?)
    }

    pub(crate) fn from_source(src: &ConfigSource) -> Result<Self, ConfigError> {
        let backend = BackendConfig::from_lookup(|key| src.get(key))?;

        let bind = src.get("BIND").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = src.parsed("PORT")?.unwrap_or(8080);
        let addr = format!("{bind}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "BIND",
                value: bind.clone(),
            })?;

        let concurrency_limit = src
            .parsed::<usize>("HTTP_MAX_CONC")?
            .unwrap_or(DEFAULT_MAX_CONC);
        if concurrency_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "HTTP_MAX_CONC",
                value: "0".into(),
            });
        }

        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match src.parsed::<u64>(key)? {
                Some(0) => Err(ConfigError::Invalid {
                    key,
                    value: "0".into(),
                }),
                Some(n) => Ok(Duration::from_secs(n)),
                None => Ok(default),
            }
        };

        let secret = match src.get("SECRET_KEY") {
            Some(key) => SecretKey {
                bytes: key.into_bytes(),
                generated: false,
            },
            None => {
                let mut bytes = vec![0u8; SECRET_BYTES];
                rand::rng().fill_bytes(&mut bytes);
                SecretKey {
                    bytes,
                    generated: true,
                }
            }
        };

        Ok(Self {
            addr,
            concurrency_limit,
            backend,
            backend_timeout: secs(
                "BACKEND_TIMEOUT_SECS",
                Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            )?,
            session_ttl: secs("SESSION_TTL_SECS", DEFAULT_TTL)?,
            context_ttl: secs("CONTEXT_TTL_SECS", DEFAULT_TTL)?,
            secret,
            rate_limiting: src.flag("RATE_LIMITING_ENABLED"),
            cookie_secure: src.flag("COOKIE_SECURE"),
            frontend_dir: src
                .get("FRONTEND_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTEND_DIR)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;
    use babel_backends::BackendKind;
    use std::io::Write;

    #[test]
    fn defaults_with_mock_engine() {
        let cfg = ServerConfig::from_source(&ConfigSource::from_pairs(&[("ENGINE", "mock")]))
            .expect("config");
        assert_eq!(cfg.addr, "0.0.0.0:8080".parse().expect("addr"));
        assert_eq!(cfg.backend.kind(), BackendKind::Mock);
        assert_eq!(cfg.session_ttl, DEFAULT_TTL);
        assert_eq!(cfg.context_ttl, DEFAULT_TTL);
        assert_eq!(cfg.backend_timeout, Duration::from_secs(60));
        assert_eq!(cfg.concurrency_limit, 1024);
        assert!(cfg.secret.generated);
        assert_eq!(cfg.secret.bytes.len(), SECRET_BYTES);
        assert!(!cfg.rate_limiting);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.frontend_dir, PathBuf::from("frontend/dist"));
    }

    #[test]
    fn missing_engine_is_fatal() {
        let err = ServerConfig::from_source(&ConfigSource::from_pairs(&[])).expect_err("engine");
        assert!(matches!(
            err,
            ConfigError::Backend(BackendConfigError::MissingEngine)
        ));
    }

    #[test]
    fn parses_overrides() {
        let cfg = ServerConfig::from_source(&ConfigSource::from_pairs(&[
            ("ENGINE", "mock"),
            ("BIND", "127.0.0.1"),
            ("PORT", "9000"),
            ("SESSION_TTL_SECS", "120"),
            ("CONTEXT_TTL_SECS", "30"),
            ("SECRET_KEY", "hunter2"),
            ("RATE_LIMITING_ENABLED", "true"),
            ("COOKIE_SECURE", "1"),
        ]))
        .expect("config");
        assert_eq!(cfg.addr, "127.0.0.1:9000".parse().expect("addr"));
        assert_eq!(cfg.session_ttl, Duration::from_secs(120));
        assert_eq!(cfg.context_ttl, Duration::from_secs(30));
        assert_eq!(cfg.secret.bytes, b"hunter2".to_vec());
        assert!(!cfg.secret.generated);
        assert!(cfg.rate_limiting);
        assert!(cfg.cookie_secure);
    }

    #[test]
    fn rejects_bad_numbers() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("HTTP_MAX_CONC", "0"),
            ("SESSION_TTL_SECS", "0"),
            ("BACKEND_TIMEOUT_SECS", "-1"),
            ("BIND", "not an ip"),
        ] {
            let err = ServerConfig::from_source(&ConfigSource::from_pairs(&[
                ("ENGINE", "mock"),
                (key, value),
            ]))
            .expect_err(key);
            assert!(matches!(err, ConfigError::Invalid { .. }), "{key}: {err}");
        }
    }

    #[test]
    fn file_values_yield_to_environment() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "engine = \"openai\"\nOPENAI_PORT = 8000\nCOOKIE_SECURE = true\nPORT = 7000"
        )
        .expect("write");

        let mut guard = env::guard();
        guard.set("BABEL_CONFIG", file.path().display().to_string());
        guard.set("PORT", "7100");
        guard.remove("ENGINE");
        guard.remove("OPENAI_BASE_URL");
        guard.remove("OPENAI_HOST");
        guard.remove("OPENAI_PORT");
        guard.remove("COOKIE_SECURE");

        let cfg = ServerConfig::from_env().expect("config");
        assert_eq!(cfg.backend.kind(), BackendKind::OpenAi);
        assert_eq!(cfg.addr.port(), 7100);
        assert!(cfg.cookie_secure);
        match cfg.backend {
            BackendConfig::OpenAi(s) => assert_eq!(s.base_url, "http://localhost:8000/v1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_tables_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[server]\nport = 1").expect("write");
        let err = read_file(file.path()).expect_err("nested");
        assert!(matches!(err, ConfigError::UnsupportedValue(k) if k == "server"));
    }
}
