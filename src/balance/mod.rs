//! Target selection policies.
//!
//! A [`SelectionPolicy`] is chosen once per group at startup and picks
//! one target from the eligible snapshot on every request. Policies
//! keep their state private and must tolerate the eligible set changing
//! between calls (targets flipping healthy/unhealthy). Submodules
//! implement round-robin ([`round_robin`]), smooth weighted
//! round-robin ([`weighted`]), sticky sessions ([`sticky`]), and
//! least-response-time ([`least_response`]).

pub mod least_response;
pub mod round_robin;
pub mod sticky;
pub mod weighted;

use std::sync::Arc;
use std::time::Duration;

use crate::config::model::{GroupConfig, PolicyKind};
use crate::target::Target;

/// Per-request context a policy may consult.
#[derive(Debug, Clone, Copy)]
pub struct PickContext<'a> {
    /// Client fingerprint for session affinity: the first
    /// `X-Forwarded-For` entry when present, else the peer IP.
    pub fingerprint: &'a str,
}

pub trait SelectionPolicy: Send + Sync {
    /// Pick a target from the eligible snapshot. `None` means no
    /// target can serve the request (the caller reports 503).
    fn pick(&self, eligible: &[Arc<Target>], ctx: &PickContext<'_>) -> Option<Arc<Target>>;

    fn name(&self) -> &'static str;
}

/// Instantiate the configured policy for a group. `targets` is the full
/// resolved target list in declaration order; `session_ttl` has been
/// validated present for sticky groups.
#[must_use]
pub fn build_policy(
    config: &GroupConfig,
    targets: &[Arc<Target>],
    session_ttl: Option<Duration>,
) -> Box<dyn SelectionPolicy> {
    match config.policy {
        PolicyKind::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        PolicyKind::Weighted => Box::new(weighted::SmoothWeighted::new(targets)),
        PolicyKind::Sticky => Box::new(sticky::Sticky::new(
            session_ttl.expect("sticky policy validated to have a session TTL"),
        )),
        PolicyKind::LeastResponseTime => Box::new(least_response::LeastResponseTime::new()),
    }
}
