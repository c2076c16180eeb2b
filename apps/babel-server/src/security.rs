use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Client address for rate limiting: `x-forwarded-for` (first hop), then
/// `x-real-ip`, then the socket peer.
pub(crate) fn client_addr<B>(req: &axum::http::Request<B>) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(',')
                .map(str::trim)
                .find(|part| !part.is_empty())
                .map(str::to_string)
        });
    if forwarded.is_some() {
        return forwarded;
    }

    if let Some(real) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return Some(real);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

fn add_header(headers: &mut HeaderMap, name: &'static str, value: &'static str) {
    let name = HeaderName::from_static(name);
    if !headers.contains_key(&name) {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

pub(crate) async fn headers_mw(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    let h = res.headers_mut();
    add_header(h, "x-content-type-options", "nosniff");
    add_header(h, "x-frame-options", "DENY");
    add_header(h, "referrer-policy", "no-referrer");
    add_header(
        h,
        "permissions-policy",
        "geolocation=(), microphone=(), camera=()",
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", " , 203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .expect("request");
        assert_eq!(client_addr(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let req = axum::http::Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .expect("request");
        assert_eq!(client_addr(&req).as_deref(), Some("198.51.100.2"));

        let mut req = axum::http::Request::builder()
            .body(Body::empty())
            .expect("request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));
        assert_eq!(client_addr(&req).as_deref(), Some("192.0.2.1"));
    }
}
