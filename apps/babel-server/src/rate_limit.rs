use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use babel_core::SharedClock;
use parking_lot::Mutex;

use crate::{responses, security, AppState};

/// A named allowance of `max` requests per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub name: &'static str,
    pub max: usize,
}

pub(crate) const SESSION_BUCKET: Bucket = Bucket {
    name: "session",
    max: 5,
};
pub(crate) const API_BUCKET: Bucket = Bucket {
    name: "api",
    max: 30,
};
pub(crate) const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter keyed by bucket and client address.
///
/// Keys with no hits left in the window are dropped; a full sweep runs at most once per window.
pub(crate) struct RateLimiter {
    window: Duration,
    clock: SharedClock,
    hits: Mutex<Hits>,
}

struct Hits {
    by_key: HashMap<String, VecDeque<Instant>>,
    swept: Instant,
}

impl RateLimiter {
    pub(crate) fn new(window: Duration, clock: SharedClock) -> Self {
        let swept = clock.now();
        Self {
            window,
            clock,
            hits: Mutex::new(Hits {
                by_key: HashMap::new(),
                swept,
            }),
        }
    }

    pub(crate) fn allow(&self, bucket: Bucket, client: Option<&str>) -> bool {
        let key = format!("{}@{}", bucket.name, client.unwrap_or("unknown"));
        let now = self.clock.now();
        let window = self.window;
        let mut hits = self.hits.lock();
        if now.saturating_duration_since(hits.swept) >= window {
            hits.by_key.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|ts| now.saturating_duration_since(*ts) <= window)
            });
            hits.swept = now;
        }
        let mut remove_key = false;
        let allowed = {
            let entry = hits.by_key.entry(key.clone()).or_default();
            entry.retain(|ts| now.saturating_duration_since(*ts) <= window);
            if entry.len() >= bucket.max {
                remove_key = entry.is_empty();
                false
            } else {
                entry.push_back(now);
                true
            }
        };
        if remove_key {
            hits.by_key.remove(&key);
        }
        allowed
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.hits.lock().by_key.len()
    }
}

async fn limit(state: &AppState, bucket: Bucket, req: Request, next: Next) -> Response {
    if let Some(limiter) = state.rate_limiter() {
        let client = security::client_addr(&req);
        if !limiter.allow(bucket, client.as_deref()) {
            tracing::info!(
                target: "babel::ratelimit",
                bucket = bucket.name,
                client = client.as_deref().unwrap_or("unknown"),
                "rate limit exceeded"
            );
            return responses::problem(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
        }
    }
    next.run(req).await
}

pub(crate) async fn session_limit_mw(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    limit(&state, SESSION_BUCKET, req, next).await
}

pub(crate) async fn api_limit_mw(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    limit(&state, API_BUCKET, req, next).await
}
