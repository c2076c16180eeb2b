use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};

use crate::{session, AppState};

/// `GET /session`: make sure the caller holds a live session cookie.
pub(crate) async fn issue(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (_, cookie) = session::ensure_session(&state, &headers);
    session::with_cookie(
        ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "OK").into_response(),
        cookie,
    )
}
