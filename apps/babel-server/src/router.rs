use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::{api, rate_limit, session, static_files, AppState};

pub(crate) mod paths {
    pub const SESSION: &str = "/session";
    pub const HEALTHZ: &str = "/healthz";
    pub const ASSETS: &str = "/assets";
    pub const TRANSLATE_START: &str = "/api/translate/start";
    pub const TRANSLATE_IMPROVE: &str = "/api/translate/improve";
    pub const TRANSLATE_PREVIEW: &str = "/api/translate/preview";
    pub const TRANSLATE_IDENTIFY: &str = "/api/translate/identify";
}

/// Every route with its per-route middleware, state applied.
pub(crate) fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(paths::TRANSLATE_START, post(api::translate::start))
        .route(paths::TRANSLATE_IMPROVE, post(api::translate::improve))
        .route(paths::TRANSLATE_PREVIEW, post(api::translate::preview))
        .route(paths::TRANSLATE_IDENTIFY, post(api::translate::identify))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::api_limit_mw,
        ));

    let session_routes = Router::new()
        .route(paths::SESSION, get(api::session::issue))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::session_limit_mw,
        ));

    let assets = ServeDir::new(state.frontend_dir().join("assets"));

    Router::new()
        .merge(api_routes)
        .merge(session_routes)
        .route(paths::HEALTHZ, get(api::health::healthz))
        .nest_service(paths::ASSETS, assets)
        .fallback(static_files::frontend)
        .with_state(state)
}
