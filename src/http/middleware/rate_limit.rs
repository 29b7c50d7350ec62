use crate::domain::error::{ErrorEnvelope, ErrorPayload};
use crate::http::rejection::proxied_client_ip;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use redis::AsyncCommands;
use std::net::{IpAddr, SocketAddr};

#[derive(Clone)]
pub struct RateLimitState {
    pub redis_client: redis::Client,
    pub max_per_minute: i64,
    /// Take the client address from proxy headers instead of the socket.
    pub trust_forwarded_for: bool,
}

/// Fixed one-minute window per client IP and path. Fails open when Redis is
/// unreachable.
pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = limit_subject(request.headers(), peer, state.trust_forwarded_for);
    let key = window_key(&ip, request.uri().path(), chrono::Utc::now());

    match state.redis_client.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let count: i64 = conn.incr(&key, 1).await.unwrap_or(1);
            let _: bool = conn.expire(&key, 120).await.unwrap_or(false);
            if count > state.max_per_minute {
                tracing::warn!(ip = %ip, path = %request.uri().path(), count, "rate limit exceeded");
                let body = ErrorEnvelope {
                    error: ErrorPayload {
                        code: "RATE_LIMITED".to_string(),
                        message: "too many requests, try again in a minute".to_string(),
                        details: None,
                    },
                };
                return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "rate limiter unavailable; allowing request");
        }
    }

    next.run(request).await
}

/// Proxy headers are client-controlled unless a trusted proxy rewrites them,
/// so they are only consulted when `trust_forwarded_for` is set.
pub fn limit_subject(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = if trust_forwarded_for {
        proxied_client_ip(headers)
    } else {
        None
    };
    forwarded
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn window_key(ip: &str, path: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("club:rate:{}:{}:{}", ip, path, now.format("%Y%m%d%H%M"))
}

#[cfg(test)]
mod tests {
    use super::{limit_subject, window_key};
    use axum::http::{HeaderMap, HeaderValue};
    use chrono::TimeZone;
    use std::net::{IpAddr, Ipv4Addr};

    fn spoofed() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.77"));
        headers
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let peer = Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
        assert_eq!(limit_subject(&spoofed(), peer, false), "203.0.113.9");
        assert_eq!(limit_subject(&spoofed(), None, false), "unknown");
        assert_eq!(limit_subject(&spoofed(), peer, true), "198.51.100.77");
        assert_eq!(limit_subject(&HeaderMap::new(), peer, true), "203.0.113.9");
    }

    #[test]
    fn key_buckets_by_minute() {
        let t = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            window_key("203.0.113.9", "/checkout-sessions", t),
            "club:rate:203.0.113.9:/checkout-sessions:202603140926"
        );
    }
}
