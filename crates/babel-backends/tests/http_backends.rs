use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use babel_backends::{CohereBackend, OpenAiCompatBackend};
use babel_core::{BackendError, ChatBackend, ChatMessage};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn record(captured: &Captured, headers: &HeaderMap, body: Value) {
    captured.bodies.lock().await.push(body);
    captured.auth.lock().await.push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
}

/// Serve `router` on an ephemeral local port and return its base URL.
async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("rules"),
        ChatMessage::user("Hello."),
        ChatMessage::assistant("Hola."),
        ChatMessage::user("Improve: formal"),
    ]
}

#[tokio::test]
async fn openai_sends_history_and_reads_first_choice() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    record(&c, &headers, body).await;
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "Buenos días."}}]
                    }))
                },
            ),
        )
        .with_state(captured.clone());
    let base = spawn_stub(router).await;
    let backend = OpenAiCompatBackend::new(
        &format!("{base}/v1/"),
        "aya-expanse:8b",
        Some("sk-local".into()),
        Duration::from_secs(5),
    )
    .expect("client");

    let reply = backend.chat(&history()).await.expect("reply");
    assert_eq!(reply, "Buenos días.");

    let bodies = captured.bodies.lock().await;
    assert_eq!(bodies[0]["model"], "aya-expanse:8b");
    let messages = bodies[0]["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(
        captured.auth.lock().await[0].as_deref(),
        Some("Bearer sk-local")
    );
}

#[tokio::test]
async fn openai_without_key_sends_no_auth() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    record(&c, &headers, body).await;
                    Json(json!({"choices": [{"message": {"content": "ok"}}]}))
                },
            ),
        )
        .with_state(captured.clone());
    let base = spawn_stub(router).await;
    let backend = OpenAiCompatBackend::new(
        &format!("{base}/v1"),
        "m",
        None,
        Duration::from_secs(5),
    )
    .expect("client");
    backend.chat(&history()).await.expect("reply");
    assert_eq!(captured.auth.lock().await[0], None);
}

#[tokio::test]
async fn openai_empty_choices_is_malformed() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = spawn_stub(router).await;
    let backend =
        OpenAiCompatBackend::new(&format!("{base}/v1"), "m", None, Duration::from_secs(5))
            .expect("client");
    let err = backend.chat(&history()).await.expect_err("malformed");
    assert!(matches!(err, BackendError::Malformed(_)));
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
    );
    let base = spawn_stub(router).await;
    let backend =
        OpenAiCompatBackend::new(&format!("{base}/v1"), "m", None, Duration::from_secs(5))
            .expect("client");
    let err = backend.chat(&history()).await.expect_err("status");
    assert_eq!(
        err,
        BackendError::Status {
            status: 503,
            body: "model loading".into()
        }
    );
}

#[tokio::test]
async fn slow_server_times_out() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"choices": [{"message": {"content": "late"}}]}))
        }),
    );
    let base = spawn_stub(router).await;
    let backend = OpenAiCompatBackend::new(
        &format!("{base}/v1"),
        "m",
        None,
        Duration::from_millis(100),
    )
    .expect("client");
    let err = backend.chat(&history()).await.expect_err("timeout");
    assert_eq!(err, BackendError::Timeout(Duration::from_millis(100)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let backend = OpenAiCompatBackend::new(
        &format!("http://{addr}/v1"),
        "m",
        None,
        Duration::from_secs(2),
    )
    .expect("client");
    let err = backend.chat(&history()).await.expect_err("transport");
    assert!(matches!(err, BackendError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn cohere_maps_roles_and_reads_text() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat",
            post(
                |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    record(&c, &headers, body).await;
                    Json(json!({"text": "Buenos días.", "generation_id": "g1"}))
                },
            ),
        )
        .with_state(captured.clone());
    let base = spawn_stub(router).await;
    let backend = CohereBackend::new(&base, "c4ai-aya-expanse-8b", "co-key", Duration::from_secs(5))
        .expect("client");

    let reply = backend.chat(&history()).await.expect("reply");
    assert_eq!(reply, "Buenos días.");

    let bodies = captured.bodies.lock().await;
    let body = &bodies[0];
    assert_eq!(body["model"], "c4ai-aya-expanse-8b");
    assert_eq!(body["preamble"], "rules");
    assert_eq!(body["message"], "Improve: formal");
    assert_eq!(
        body["chat_history"],
        json!([
            {"role": "USER", "message": "Hello."},
            {"role": "CHATBOT", "message": "Hola."}
        ])
    );
    assert_eq!(captured.auth.lock().await[0].as_deref(), Some("Bearer co-key"));
}

#[tokio::test]
async fn cohere_rejects_history_not_ending_in_user() {
    let backend = CohereBackend::new(
        "http://127.0.0.1:9",
        "m",
        "k",
        Duration::from_secs(1),
    )
    .expect("client");
    let err = backend
        .chat(&[ChatMessage::system("rules"), ChatMessage::assistant("hi")])
        .await
        .expect_err("rejected");
    assert!(matches!(err, BackendError::Rejected(_)));
}
