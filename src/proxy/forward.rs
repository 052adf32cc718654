//! Upstream dispatch: build the rewritten request, forward it, relay
//! the response.
//!
//! Method, body, and query string are copied verbatim; headers go
//! through [`build_upstream_headers`]. One deadline — the configured
//! connection timeout — covers connect, response headers, and the full
//! body. An upstream that responds is relayed verbatim whatever its
//! status; only transport failures map into [`ProxyError`]. Transport
//! failures never touch health state (that is the supervisor's
//! domain), but they do release the target's connection count, and the
//! TTFB sample is skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, Full};

use crate::error::ProxyError;
use crate::server::HttpClient;
use crate::target::Target;

use super::headers::{build_upstream_headers, strip_response_headers, ProxyHeaderContext};

pub struct ForwardRequest<'a> {
    pub client: &'a HttpClient,
    pub target: &'a Arc<Target>,
    pub method: &'a Method,
    pub original_headers: &'a HeaderMap,
    pub body: Bytes,
    /// Path with the rule's rewrite prefix already stripped.
    pub remainder: &'a str,
    pub query: Option<&'a str>,
    pub timeout: Duration,
    pub proxy_headers: Option<ProxyHeaderContext<'a>>,
}

pub async fn forward(req: ForwardRequest<'_>) -> Result<Response, ProxyError> {
    let uri = req.target.uri_for(req.remainder, req.query);
    let mut headers = build_upstream_headers(req.original_headers, req.proxy_headers.as_ref());

    // The client's Host was stripped as hop-by-hop; the upstream hop
    // gets the target authority.
    if let Ok(host) = HeaderValue::from_str(&req.target.addr().to_string()) {
        headers.insert(hyper::header::HOST, host);
    }

    let mut builder = hyper::Request::builder().method(req.method.clone()).uri(uri);
    for (key, value) in &headers {
        builder = builder.header(key, value);
    }
    let upstream_request = builder
        .body(Full::new(req.body))
        .map_err(|e| ProxyError::UpstreamConnect(Box::new(e)))?;

    let deadline = tokio::time::Instant::now() + req.timeout;
    let started = Instant::now();
    req.target.begin_request();

    let response = match tokio::time::timeout_at(deadline, req.client.request(upstream_request)).await
    {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            req.target.end_request(None);
            return Err(ProxyError::UpstreamConnect(Box::new(e)));
        }
        Err(_) => {
            req.target.end_request(None);
            return Err(ProxyError::UpstreamTimeout);
        }
    };

    // Headers have arrived: this is the TTFB observation.
    let ttfb_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (parts, body) = response.into_parts();

    let body_bytes = match tokio::time::timeout_at(deadline, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) => {
            // Reset mid-body: nothing usable arrived from upstream.
            req.target.end_request(None);
            return Err(ProxyError::UpstreamConnect(Box::new(e)));
        }
        Err(_) => {
            req.target.end_request(None);
            return Err(ProxyError::UpstreamTimeout);
        }
    };

    req.target.end_request(Some(ttfb_ms));

    let mut response_headers = parts.headers;
    strip_response_headers(&mut response_headers);

    let mut builder = Response::builder().status(parts.status);
    for (key, value) in &response_headers {
        builder = builder.header(key, value);
    }

    Ok(builder.body(Body::from(body_bytes)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to build relay response");
        StatusCode::BAD_GATEWAY.into_response()
    }))
}
