//! Header construction and hop-by-hop stripping.
//!
//! [`build_upstream_headers`] clones the client headers, strips
//! hop-by-hop headers, and — when the proxy-header convention is
//! enabled — adds `X-Forwarded-For` (appending the client IP to any
//! existing chain), `X-Forwarded-Host`, `X-Forwarded-Port`,
//! `X-Forwarded-Proto`, `X-Real-IP`, and a fresh `X-Request-Id`.
//! [`strip_response_headers`] applies the same hop-by-hop stripping on
//! the way back.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that only apply between adjacent peers, per RFC 9110 §7.6.1.
/// `Host` is regenerated from the upstream URI by the client.
static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "host",
        "connection",
        "keep-alive",
        "transfer-encoding",
        "upgrade",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Context for the `X-Forwarded-*` convention headers.
#[derive(Debug, Clone, Copy)]
pub struct ProxyHeaderContext<'a> {
    /// Peer IP of the inbound connection.
    pub client_ip: &'a str,
    /// The port this load balancer listens on.
    pub listener_port: u16,
    /// Fresh UUID generated per request.
    pub request_id: &'a str,
}

/// Strip hop-by-hop headers and `content-length` from an upstream
/// response. The body has been fully collected, so the origin's
/// framing headers are no longer accurate; axum sets the correct
/// `content-length` from the actual body bytes.
pub fn strip_response_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

#[must_use]
pub fn build_upstream_headers(
    original: &HeaderMap,
    proxy: Option<&ProxyHeaderContext<'_>>,
) -> HeaderMap {
    let mut headers = original.clone();

    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }

    if let Some(ctx) = proxy {
        // X-Forwarded-For: append to any existing chain
        let xff = original
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || ctx.client_ip.to_string(),
                |existing| format!("{existing}, {}", ctx.client_ip),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }

        // X-Real-IP: first hop in the chain
        let real_ip = xff.split(',').next().unwrap_or(ctx.client_ip).trim();
        if let Ok(val) = HeaderValue::from_str(real_ip) {
            headers.insert("x-real-ip", val);
        }

        // X-Forwarded-Host: the Host the client targeted
        if let Some(original_host) = original.get("host") {
            headers.insert("x-forwarded-host", original_host.clone());
        }

        if let Ok(val) = HeaderValue::from_str(&ctx.listener_port.to_string()) {
            headers.insert("x-forwarded-port", val);
        }

        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));

        if let Ok(val) = HeaderValue::from_str(ctx.request_id) {
            headers.insert("x-request-id", val);
        }
    }

    headers
}
