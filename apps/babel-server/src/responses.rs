use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use babel_core::{BackendError, TranslateError};
use serde_json::json;

/// Problem-details JSON body with the given status.
pub(crate) fn problem(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "type": "about:blank",
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "detail": detail.into(),
        })),
    )
        .into_response()
}

/// Handler error rendered as a problem response.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        problem(self.status, self.detail)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<TranslateError> for ApiError {
    fn from(err: TranslateError) -> Self {
        let status = match &err {
            TranslateError::ContextUnknown => StatusCode::NOT_FOUND,
            TranslateError::ContextExpired => StatusCode::GONE,
            TranslateError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            TranslateError::Backend(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            TranslateError::Backend(_) | TranslateError::Parse { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::warn!(target: "babel::api", error = %err, status = status.as_u16(), "translation failed");
        }
        ApiError::new(status, err.to_string())
    }
}
