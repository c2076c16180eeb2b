use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use babel_core::{system_clock, SessionStore, TranslationEngine, TranslationService};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    config::ServerConfig,
    rate_limit::{self, RateLimiter},
    router::build_router,
    security,
    session::CookieSigner,
};

pub(crate) struct BootstrapOutput {
    pub router: Router,
    pub state: AppState,
}

/// Wire stores, backend and router from `cfg`.
pub(crate) fn build(cfg: &ServerConfig) -> anyhow::Result<BootstrapOutput> {
    let backend = cfg
        .backend
        .build(cfg.backend_timeout)
        .context("initialise chat backend")?;
    let clock = system_clock();
    let translator = TranslationService::new(
        TranslationEngine::new(backend),
        cfg.context_ttl,
        clock.clone(),
    );
    let sessions = SessionStore::new(cfg.session_ttl, clock.clone());

    if cfg.secret.generated {
        warn!("SECRET_KEY not set, generated a random one; sessions will not survive a restart");
    }
    let signer = CookieSigner::new(&cfg.secret.bytes)
        .map_err(|_| anyhow::anyhow!("SECRET_KEY cannot be used as an HMAC key"))?;

    let limiter = if cfg.rate_limiting {
        info!("rate limiting enabled");
        Some(RateLimiter::new(rate_limit::WINDOW, clock))
    } else {
        warn!("rate limiting disabled");
        None
    };

    let state = AppState::builder(Arc::new(sessions), Arc::new(translator), signer)
        .with_rate_limiter(limiter)
        .with_frontend_dir(cfg.frontend_dir.clone())
        .with_backend_timeout(cfg.backend_timeout)
        .with_cookie_secure(cfg.cookie_secure)
        .build();

    Ok(BootstrapOutput {
        router: build_router(state.clone()),
        state,
    })
}

pub(crate) fn attach_http_layers(router: Router, concurrency_limit: usize) -> Router {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::trace::TraceLayer;

    router
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

pub(crate) fn attach_global_layers(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(security::headers_mw))
}
