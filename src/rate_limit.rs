use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::views;

pub const MSG_TOO_MANY_REQUESTS: &str = "Terlalu banyak permintaan, coba lagi nanti.";

/// Map size above which stale windows are dropped on insert.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed-window request counter per client key.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request from `key`. `Err` carries the time left until the
    /// client's window resets.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() >= PRUNE_THRESHOLD && !clients.contains_key(key) {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.start) < window);
        }

        let entry = clients.entry(key.to_owned()).or_insert(Window {
            start: now,
            count: 0,
        });
        if now.duration_since(entry.start) >= self.window {
            *entry = Window {
                start: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return Err(self.window - now.duration_since(entry.start));
        }
        entry.count += 1;
        Ok(())
    }

    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }
}

/// Peer address from the connection, when the server was started with
/// connect info.
fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}

pub async fn limit_by_client(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);
    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!(client = %key, retry_after_secs = retry_after.as_secs(), "rate limit exceeded");
            let mut res = (
                StatusCode::TOO_MANY_REQUESTS,
                views::system_error(MSG_TOO_MANY_REQUESTS),
            )
                .into_response();
            // Round up so a client never retries before the window resets.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, v);
            }
            res
        }
    }
}
