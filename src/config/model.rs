//! Serde data structures for the Junction configuration file.
//!
//! Contains [`Config`] (the root), [`ListenerConfig`], [`GroupConfig`],
//! [`EndpointConfig`], [`HealthCheckConfig`], and [`RuleConfig`]. All
//! types derive `Serialize` and `Deserialize` with `deny_unknown_fields`
//! for strict parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const fn default_listener_port() -> u16 {
    8080
}

const fn default_connection_timeout_ms() -> u64 {
    5000
}

fn default_health_path() -> String {
    "/health".to_string()
}

const fn default_health_interval_ms() -> u64 {
    30_000
}

const fn default_health_threshold() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,

    pub groups: Vec<GroupConfig>,

    /// Ordered: declaration order breaks ties between equal-length
    /// prefixes.
    pub rules: Vec<RuleConfig>,
}

impl Config {
    #[must_use]
    pub fn total_endpoints(&self) -> usize {
        self.groups.iter().map(|g| g.targets.len()).sum()
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    #[serde(default = "default_listener_port")]
    pub port: u16,

    /// Upstream deadline covering connect + full response.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Add the X-Forwarded-* / X-Real-IP / X-Request-Id convention
    /// headers on forward.
    #[serde(default)]
    pub proxy_headers: bool,

    /// Sticky session lifetime. Required when any group uses the
    /// sticky policy.
    pub session_ttl_ms: Option<u64>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: default_listener_port(),
            connection_timeout_ms: default_connection_timeout_ms(),
            proxy_headers: false,
            session_ttl_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,

    pub policy: PolicyKind,

    pub targets: Vec<EndpointConfig>,

    /// Per-endpoint weights, keyed by `host:port` or bare host.
    /// Required iff `policy` is `weighted`.
    pub weights: Option<HashMap<String, u32>>,

    /// Presence enables active health checks for this group.
    pub health_check: Option<HealthCheckConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    RoundRobin,
    Weighted,
    Sticky,
    LeastResponseTime,
}

impl PolicyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Weighted => "weighted",
            Self::Sticky => "sticky",
            Self::LeastResponseTime => "least_response_time",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Hostname or IP literal. Resolved at startup; one target is
    /// created per resolved address.
    pub host: String,

    pub port: u16,

    /// Prepended to every forwarded path for targets of this endpoint.
    pub base_uri: Option<String>,
}

impl EndpointConfig {
    /// The key this endpoint is looked up under in a group weight map.
    #[must_use]
    pub fn weight_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_path")]
    pub path: String,

    #[serde(default = "default_health_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive 200 probes required to turn a target healthy.
    #[serde(default = "default_health_threshold")]
    pub succeed_threshold: u32,

    /// Consecutive failed probes required to turn a target unhealthy.
    #[serde(default = "default_health_threshold")]
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            interval_ms: default_health_interval_ms(),
            succeed_threshold: default_health_threshold(),
            failure_threshold: default_health_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Absolute path prefix matched against incoming request paths.
    pub prefix: String,

    /// Stripped from the matched path before forwarding. Must itself
    /// be a prefix of `prefix` when non-empty.
    #[serde(default)]
    pub rewrite: String,

    /// Name of the target group requests are routed to.
    pub group: String,
}
