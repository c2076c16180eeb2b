use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use babel_core::LanguageTag;
use serde::{Deserialize, Serialize};

use crate::{responses::ApiError, session::SessionId, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct SourceRequest {
    #[serde(default)]
    source: String,
    #[serde(default)]
    lang: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImproveRequest {
    #[serde(default)]
    context_id: String,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentifyRequest {
    #[serde(default)]
    source: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartResponse {
    context_id: String,
    result: String,
    source_lang: LanguageTag,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    result: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdentifyResponse {
    lang: LanguageTag,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(value)
}

fn target(lang: &str) -> Result<LanguageTag, ApiError> {
    required("lang", lang)?;
    LanguageTag::parse(lang).map_err(|err| ApiError::bad_request(err.to_string()))
}

/// `POST /api/translate/start`
pub(crate) async fn start(
    State(state): State<AppState>,
    Extension(SessionId(session)): Extension<SessionId>,
    body: Result<Json<SourceRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let Json(req) = body?;
    let source = required("source", &req.source)?;
    let lang = target(&req.lang)?;
    let translator = state.translator();
    let source_lang = translator.identify(source, &state.call_context()).await?;
    let (context_id, result) = translator
        .start(&session, source, &lang, &state.call_context())
        .await?;
    tracing::debug!(target: "babel::api", target_lang = %lang, source_lang = %source_lang, "translation started");
    Ok(Json(StartResponse {
        context_id,
        result,
        source_lang,
    }))
}

/// `POST /api/translate/improve`
pub(crate) async fn improve(
    State(state): State<AppState>,
    Extension(SessionId(session)): Extension<SessionId>,
    body: Result<Json<ImproveRequest>, JsonRejection>,
) -> Result<Json<ResultResponse>, ApiError> {
    let Json(req) = body?;
    let context_id = required("contextId", &req.context_id)?;
    let feedback = required("feedback", &req.feedback)?;
    let result = state
        .translator()
        .improve(&session, context_id, feedback, &state.call_context())
        .await?;
    Ok(Json(ResultResponse { result }))
}

/// `POST /api/translate/preview`
pub(crate) async fn preview(
    State(state): State<AppState>,
    body: Result<Json<SourceRequest>, JsonRejection>,
) -> Result<Json<ResultResponse>, ApiError> {
    let Json(req) = body?;
    let source = required("source", &req.source)?;
    let lang = target(&req.lang)?;
    let result = state
        .translator()
        .preview(source, &lang, &state.call_context())
        .await?;
    Ok(Json(ResultResponse { result }))
}

/// `POST /api/translate/identify`
pub(crate) async fn identify(
    State(state): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let Json(req) = body?;
    let source = required("source", &req.source)?;
    let lang = state
        .translator()
        .identify(source, &state.call_context())
        .await?;
    Ok(Json(IdentifyResponse { lang }))
}
