use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{responses, session, AppState};

const MISSING_BUILD: &str =
    "Error: Frontend build not found. Please run 'npm run build' in the frontend directory.";

/// Map a request path onto `root`, refusing anything but plain segments.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let rel = Path::new(uri_path.trim_start_matches('/'));
    if rel.as_os_str().is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(rel))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn serve_file(path: PathBuf, req: Request) -> Response {
    match ServeFile::new(path).oneshot(req).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    }
}

/// Fallback: a file from the frontend build, else the SPA index with a session.
pub(crate) async fn frontend(State(state): State<AppState>, req: Request) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return responses::problem(StatusCode::NOT_FOUND, "no such route");
    }
    let path = req.uri().path().to_string();
    if path.starts_with("/api/") {
        return responses::problem(StatusCode::NOT_FOUND, "no such route");
    }

    let root = state.frontend_dir().to_path_buf();
    if let Some(file) = resolve(&root, &path) {
        if is_file(&file).await {
            return serve_file(file, req).await;
        }
    }

    let (_, cookie) = session::ensure_session(&state, req.headers());
    let index = root.join("index.html");
    let res = if is_file(&index).await {
        serve_file(index, req).await
    } else {
        tracing::error!(target: "babel::frontend", dir = %root.display(), "frontend build not found");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            MISSING_BUILD,
        )
            .into_response()
    };
    session::with_cookie(res, cookie)
}
