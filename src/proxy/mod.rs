//! Core HTTP request pipeline.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every inbound request: it resolves the path against the rule table,
//! takes an eligible snapshot of the matched group, asks the group's
//! policy for a target, and delegates to the forwarder. Submodules
//! handle rule matching ([`routing`]), header construction
//! ([`headers`]), and upstream dispatch ([`forward`]).

pub mod forward;
pub mod headers;
pub mod routing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::balance::PickContext;
use crate::error::ProxyError;
use crate::server::AppState;

use forward::ForwardRequest;
use headers::ProxyHeaderContext;

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let client_ip = addr.ip().to_string();
    let path = uri.path().to_string();

    match dispatch(&state, &method, &uri, &req_headers, body, &client_ip, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = e.status().as_u16(),
                error = %e,
                "request failed"
            );
            e.into_response()
        }
    }
}

async fn dispatch(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    req_headers: &HeaderMap,
    body: Bytes,
    client_ip: &str,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let path = uri.path();

    let rule = state.rules.resolve(path).ok_or(ProxyError::NoRule)?;

    // Rules are validated against group names at startup, so a miss
    // here means the group genuinely cannot serve.
    let group = state
        .groups
        .get(&rule.group)
        .ok_or_else(|| ProxyError::NoHealthyTargets(rule.group.clone()))?;

    let eligible = group.eligible();
    if eligible.is_empty() {
        return Err(ProxyError::NoHealthyTargets(group.name().to_string()));
    }

    let fingerprint = session_fingerprint(req_headers, client_ip);
    let ctx = PickContext {
        fingerprint: &fingerprint,
    };
    let target = group
        .pick(&eligible, &ctx)
        .ok_or_else(|| ProxyError::NoHealthyTargets(group.name().to_string()))?;

    let remainder = rule.rewrite_path(path);

    let proxy_headers = state.settings.proxy_headers.then(|| ProxyHeaderContext {
        client_ip,
        listener_port: state.settings.port,
        request_id,
    });

    let started = Instant::now();
    let response = forward::forward(ForwardRequest {
        client: &state.http_client,
        target: &target,
        method,
        original_headers: req_headers,
        body,
        remainder: &remainder,
        query: uri.query(),
        timeout: state.settings.connection_timeout,
        proxy_headers,
    })
    .await?;

    #[allow(clippy::cast_possible_truncation)]
    let latency_ms = started.elapsed().as_millis() as u64;
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        group = %group.name(),
        policy = group.policy_name(),
        target = %target.id(),
        status = response.status().as_u16(),
        latency_ms,
        "request forwarded"
    );

    Ok(response)
}

/// Client identity for sticky routing: the first `X-Forwarded-For`
/// entry when present, else the peer IP of the inbound connection.
fn session_fingerprint(headers: &HeaderMap, peer_ip: &str) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| peer_ip.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_prefers_the_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());

        assert_eq!(session_fingerprint(&headers, "10.0.0.2"), "203.0.113.9");
    }

    #[test]
    fn fingerprint_falls_back_to_the_peer_ip() {
        let headers = HeaderMap::new();
        assert_eq!(session_fingerprint(&headers, "10.0.0.2"), "10.0.0.2");
    }

    #[test]
    fn blank_forwarded_header_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "  ".parse().unwrap());

        assert_eq!(session_fingerprint(&headers, "10.0.0.2"), "10.0.0.2");
    }
}
