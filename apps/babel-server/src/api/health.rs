use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    ok: bool,
    engine: &'static str,
    sessions: usize,
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        ok: true,
        engine: state.translator().engine().backend_id(),
        sessions: state.sessions().len(),
    })
}
