//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the rule
//! table, target groups, and pooled HTTP client), [`build_router`] for
//! constructing the Axum router with middleware layers,
//! [`build_http_client`] for the connection-pooled hyper client, and
//! [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::Config;
use crate::error::JunctionError;
use crate::group::TargetGroup;
use crate::health::SupervisorHandle;
use crate::proxy;
use crate::proxy::routing::RuleTable;

pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Listener-level settings shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct ListenerSettings {
    pub port: u16,
    /// Upstream deadline covering connect + full response.
    pub connection_timeout: Duration,
    pub proxy_headers: bool,
}

pub struct AppState {
    pub rules: RuleTable,
    pub groups: HashMap<String, Arc<TargetGroup>>,
    pub http_client: HttpClient,
    pub settings: ListenerSettings,
}

impl AppState {
    /// Resolve every group (DNS happens here, once) and precompute the
    /// rule table from a validated config.
    pub async fn from_config(config: &Config) -> Result<Self, JunctionError> {
        let session_ttl = config.listener.session_ttl_ms.map(Duration::from_millis);

        let mut groups = HashMap::new();
        for group_config in &config.groups {
            let group = TargetGroup::from_config(group_config, session_ttl).await?;
            groups.insert(group_config.name.clone(), Arc::new(group));
        }

        Ok(Self {
            rules: RuleTable::new(&config.rules),
            groups,
            http_client: build_http_client(),
            settings: ListenerSettings {
                port: config.listener.port,
                connection_timeout: Duration::from_millis(config.listener.connection_timeout_ms),
                proxy_headers: config.listener.proxy_headers,
            },
        })
    }

    /// Start one probe task per group with checks enabled.
    #[must_use]
    pub fn spawn_supervisors(&self) -> Vec<SupervisorHandle> {
        self.groups
            .values()
            .filter_map(|group| group.spawn_supervisor())
            .collect()
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build_http()
}

/// Every path and method funnels through the proxy pipeline; the
/// listener deliberately exposes no endpoints of its own.
pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
