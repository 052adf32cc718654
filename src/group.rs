//! Target groups: named pools of resolved targets sharing a selection
//! policy and health-check settings.
//!
//! Hostnames are resolved once at startup — one [`Target`] per distinct
//! resolved address, in declaration order. There is no re-resolution;
//! operators restart the process to refresh DNS. The group's
//! [`eligible`](TargetGroup::eligible) view is the only thing the
//! request path consults: it filters on the supervisor's healthy flags
//! when checks are enabled and returns every target otherwise.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::balance::{build_policy, PickContext, SelectionPolicy};
use crate::config::model::{EndpointConfig, GroupConfig};
use crate::error::JunctionError;
use crate::health::{HealthSupervisor, SupervisorHandle};
use crate::target::Target;

pub struct TargetGroup {
    name: String,
    targets: Vec<Arc<Target>>,
    policy: Box<dyn SelectionPolicy>,
    supervisor: Option<Arc<HealthSupervisor>>,
}

impl TargetGroup {
    /// Resolve endpoints and assemble the group. Resolution failures
    /// and endpoints with no addresses are fatal.
    pub async fn from_config(
        config: &GroupConfig,
        session_ttl: Option<Duration>,
    ) -> Result<Self, JunctionError> {
        let targets = resolve_targets(config).await?;

        info!(
            group = %config.name,
            policy = config.policy.as_str(),
            targets = targets.len(),
            health_checks = config.health_check.is_some(),
            "target group ready"
        );

        let policy = build_policy(config, &targets, session_ttl);

        let supervisor = config
            .health_check
            .as_ref()
            .map(|hc| Arc::new(HealthSupervisor::new(&config.name, hc.clone(), &targets)));

        Ok(Self {
            name: config.name.clone(),
            targets,
            policy,
            supervisor,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Snapshot of the targets currently allowed to receive traffic.
    #[must_use]
    pub fn eligible(&self) -> Vec<Arc<Target>> {
        match &self.supervisor {
            Some(supervisor) => self
                .targets
                .iter()
                .enumerate()
                .filter(|(index, _)| supervisor.is_healthy(*index))
                .map(|(_, target)| Arc::clone(target))
                .collect(),
            None => self.targets.clone(),
        }
    }

    /// Delegate to the group's policy over an eligible snapshot.
    #[must_use]
    pub fn pick(&self, eligible: &[Arc<Target>], ctx: &PickContext<'_>) -> Option<Arc<Target>> {
        self.policy.pick(eligible, ctx)
    }

    /// Start the background probe task, when checks are enabled.
    #[must_use]
    pub fn spawn_supervisor(&self) -> Option<SupervisorHandle> {
        self.supervisor
            .as_ref()
            .map(|supervisor| supervisor.spawn(self.targets.clone()))
    }

    /// Test hook: drive the supervisor's state machine directly.
    #[cfg(test)]
    pub(crate) fn supervisor(&self) -> Option<&Arc<HealthSupervisor>> {
        self.supervisor.as_ref()
    }
}

async fn resolve_targets(config: &GroupConfig) -> Result<Vec<Arc<Target>>, JunctionError> {
    let mut targets = Vec::new();
    let mut seen: HashSet<SocketAddr> = HashSet::new();

    for endpoint in &config.targets {
        let authority = endpoint.weight_key();
        let weight = endpoint_weight(config, endpoint);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&authority)
            .await
            .map_err(|e| JunctionError::Resolve {
                endpoint: authority.clone(),
                reason: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(JunctionError::Resolve {
                endpoint: authority,
                reason: "hostname resolved to no addresses".into(),
            });
        }

        for addr in addrs {
            if seen.insert(addr) {
                targets.push(Arc::new(Target::new(
                    addr,
                    endpoint.base_uri.as_deref(),
                    weight,
                )));
            }
        }
    }

    Ok(targets)
}

/// Weight resolution mirrors validation: `host:port` key first, bare
/// host as fallback, 1 for non-weighted groups.
fn endpoint_weight(config: &GroupConfig, endpoint: &EndpointConfig) -> u32 {
    config
        .weights
        .as_ref()
        .and_then(|weights| {
            weights
                .get(&endpoint.weight_key())
                .or_else(|| weights.get(&endpoint.host))
        })
        .copied()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{HealthCheckConfig, PolicyKind};
    use crate::health::ProbeOutcome;

    fn group_config(policy: PolicyKind, health: bool) -> GroupConfig {
        GroupConfig {
            name: "web".into(),
            policy,
            targets: vec![
                EndpointConfig {
                    host: "127.0.0.1".into(),
                    port: 8081,
                    base_uri: None,
                },
                EndpointConfig {
                    host: "127.0.0.1".into(),
                    port: 8082,
                    base_uri: None,
                },
            ],
            weights: None,
            health_check: health.then(HealthCheckConfig::default),
        }
    }

    #[tokio::test]
    async fn ip_endpoints_resolve_to_one_target_each() {
        let group = TargetGroup::from_config(&group_config(PolicyKind::RoundRobin, false), None)
            .await
            .unwrap();

        assert_eq!(group.targets().len(), 2);
        assert_eq!(group.targets()[0].id(), "127.0.0.1:8081");
        assert_eq!(group.targets()[1].id(), "127.0.0.1:8082");
    }

    #[tokio::test]
    async fn duplicate_addresses_collapse() {
        let mut config = group_config(PolicyKind::RoundRobin, false);
        config.targets.push(EndpointConfig {
            host: "127.0.0.1".into(),
            port: 8081,
            base_uri: None,
        });

        let group = TargetGroup::from_config(&config, None).await.unwrap();
        assert_eq!(group.targets().len(), 2);
    }

    #[tokio::test]
    async fn checks_disabled_means_all_eligible() {
        let group = TargetGroup::from_config(&group_config(PolicyKind::RoundRobin, false), None)
            .await
            .unwrap();

        assert_eq!(group.eligible().len(), 2);
    }

    #[tokio::test]
    async fn checks_enabled_gates_on_probe_results() {
        let group = TargetGroup::from_config(&group_config(PolicyKind::RoundRobin, true), None)
            .await
            .unwrap();

        // Nothing has passed a probe yet.
        assert!(group.eligible().is_empty());

        let supervisor = group.supervisor().unwrap();
        supervisor.observe(0, ProbeOutcome::Success);
        supervisor.observe(0, ProbeOutcome::Success);

        let eligible = group.eligible();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id(), "127.0.0.1:8081");
    }

    #[tokio::test]
    async fn weights_fall_back_from_host_port_to_bare_host() {
        let mut config = group_config(PolicyKind::Weighted, false);
        config.weights = Some(
            [("127.0.0.1:8081".to_string(), 3), ("127.0.0.1".to_string(), 7)]
                .into_iter()
                .collect(),
        );

        let group = TargetGroup::from_config(&config, None).await.unwrap();
        assert_eq!(group.targets()[0].weight(), 3);
        assert_eq!(group.targets()[1].weight(), 7);
    }
}
