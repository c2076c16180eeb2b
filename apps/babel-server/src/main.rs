use std::net::SocketAddr;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod api;
mod app_state;
mod bootstrap;
mod config;
mod rate_limit;
mod responses;
mod router;
mod security;
mod session;
mod static_files;
mod telemetry;
#[cfg(test)]
mod test_support;

pub(crate) use app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let cfg = match config::ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let bootstrap::BootstrapOutput { router, state } = bootstrap::build(&cfg)?;
    let app = bootstrap::attach_global_layers(bootstrap::attach_http_layers(
        router,
        cfg.concurrency_limit,
    ));

    let listener = tokio::net::TcpListener::bind(cfg.addr)
        .await
        .with_context(|| format!("bind {}", cfg.addr))?;
    info!(
        addr = %cfg.addr,
        engine = %cfg.backend.kind(),
        session_ttl_secs = cfg.session_ttl.as_secs(),
        context_ttl_secs = cfg.context_ttl.as_secs(),
        frontend = %cfg.frontend_dir.display(),
        "babel-server listening"
    );

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state.shutdown_token().clone()));

    if let Err(err) = server.await {
        error!("http server exited with error: {err}");
    }
    info!(sessions = state.sessions().len(), "server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, cancelling `shutdown` so in-flight backend calls end.
async fn shutdown_signal(shutdown: CancellationToken) {
    info!("shutdown signal listener active");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
    shutdown.cancel();
}
