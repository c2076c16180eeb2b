use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use babel_core::{CallContext, SessionStore, TranslationService};
use tokio_util::sync::CancellationToken;

use crate::rate_limit::RateLimiter;
use crate::session::CookieSigner;

#[derive(Clone)]
pub(crate) struct AppState {
    sessions: Arc<SessionStore>,
    translator: Arc<TranslationService>,
    signer: Arc<CookieSigner>,
    limiter: Option<Arc<RateLimiter>>,
    frontend_dir: Arc<PathBuf>,
    backend_timeout: Duration,
    cookie_secure: bool,
    shutdown: CancellationToken,
}

pub(crate) struct AppStateBuilder {
    state: AppState,
}

impl AppState {
    pub(crate) fn builder(
        sessions: Arc<SessionStore>,
        translator: Arc<TranslationService>,
        signer: CookieSigner,
    ) -> AppStateBuilder {
        AppStateBuilder {
            state: AppState {
                sessions,
                translator,
                signer: Arc::new(signer),
                limiter: None,
                frontend_dir: Arc::new(PathBuf::from(crate::config::DEFAULT_FRONTEND_DIR)),
                backend_timeout: Duration::from_secs(crate::config::DEFAULT_BACKEND_TIMEOUT_SECS),
                cookie_secure: false,
                shutdown: CancellationToken::new(),
            },
        }
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub(crate) fn translator(&self) -> &TranslationService {
        &self.translator
    }

    pub(crate) fn signer(&self) -> &CookieSigner {
        &self.signer
    }

    pub(crate) fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_deref()
    }

    pub(crate) fn frontend_dir(&self) -> &Path {
        &self.frontend_dir
    }

    pub(crate) fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Deadline and cancellation for one backend call made on behalf of a request.
    pub(crate) fn call_context(&self) -> CallContext {
        CallContext::new()
            .with_deadline(self.backend_timeout)
            .with_cancellation(self.shutdown.child_token())
    }
}

impl AppStateBuilder {
    pub(crate) fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.state.limiter = limiter.map(Arc::new);
        self
    }

    pub(crate) fn with_frontend_dir(mut self, dir: PathBuf) -> Self {
        self.state.frontend_dir = Arc::new(dir);
        self
    }

    pub(crate) fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.state.backend_timeout = timeout;
        self
    }

    pub(crate) fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.state.cookie_secure = secure;
        self
    }

    pub(crate) fn build(self) -> AppState {
        self.state
    }
}
