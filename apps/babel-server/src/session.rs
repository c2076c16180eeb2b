use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{responses, AppState};

pub(crate) const COOKIE_NAME: &str = "session_token";

type HmacSha256 = Hmac<Sha256>;

/// Authenticated session token, placed in request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub(crate) struct SessionId(pub String);

/// Signs session tokens so a client cannot mint its own cookie value.
#[derive(Clone)]
pub(crate) struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub(crate) fn new(key: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key)?,
        })
    }

    /// `{token}.{hex signature}`
    pub(crate) fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        format!("{token}.{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// The token inside `value` if its signature checks out.
    pub(crate) fn verify(&self, value: &str) -> Option<String> {
        let (token, sig) = value.rsplit_once('.')?;
        let sig = hex::decode(sig).ok()?;
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&sig).ok()?;
        Some(token.to_string())
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Live session token carried by the request's signed cookie, if any.
pub(crate) fn session_from_headers(headers: &HeaderMap, signer: &CookieSigner) -> Option<String> {
    cookie_value(headers, COOKIE_NAME).and_then(|v| signer.verify(v))
}

fn set_cookie(value: &str, ttl: Duration, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{COOKIE_NAME}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// Renew the caller's session or mint a new one.
///
/// Returns the token and, when a new one was minted, the `Set-Cookie` header to send.
pub(crate) fn ensure_session(state: &AppState, headers: &HeaderMap) -> (String, Option<HeaderValue>) {
    if let Some(token) = session_from_headers(headers, state.signer()) {
        if state.sessions().touch(&token) {
            return (token, None);
        }
    }
    let token = state.sessions().issue();
    tracing::debug!(target: "babel::session", "issued session");
    let cookie = set_cookie(
        &state.signer().sign(&token),
        state.sessions().ttl(),
        state.cookie_secure(),
    );
    (token, cookie)
}

pub(crate) fn with_cookie(mut res: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
    res
}

/// Reject requests without a live, correctly signed session; renews it otherwise.
pub(crate) async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = session_from_headers(req.headers(), state.signer())
        .filter(|token| state.sessions().touch(token));
    match token {
        Some(token) => {
            req.extensions_mut().insert(SessionId(token));
            next.run(req).await
        }
        None => responses::problem(StatusCode::UNAUTHORIZED, "missing or expired session")
            .into_response(),
    }
}
