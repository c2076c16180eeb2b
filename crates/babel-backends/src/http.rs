use std::time::Duration;

use babel_core::BackendError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);
const POOL_IDLE: Duration = Duration::from_secs(90);

fn user_agent() -> String {
    format!("babel-backends/{}", env!("CARGO_PKG_VERSION"))
}

/// Client with harmonized connection defaults and the given per-request timeout.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(POOL_IDLE)
        .timeout(timeout)
        .build()
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Transport(err.to_string())
    }
}

/// Send `request` and hand back the body of a 2xx response.
pub(crate) async fn send(
    backend: &'static str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<Vec<u8>, BackendError> {
    let resp = request.send().await.map_err(|err| {
        tracing::warn!(target: "babel::backend", backend, error = %err, "request failed");
        transport_error(err, timeout)
    })?;
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|err| transport_error(err, timeout))?;
    if !status.is_success() {
        tracing::warn!(
            target: "babel::backend",
            backend,
            status = status.as_u16(),
            "non-success response"
        );
        return Err(BackendError::status(
            status.as_u16(),
            String::from_utf8_lossy(&bytes),
        ));
    }
    Ok(bytes.to_vec())
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(bytes).map_err(|err| BackendError::Malformed(err.to_string()))
}
