//! Background health supervision for target groups.
//!
//! One [`HealthSupervisor`] runs per group with checks enabled. A
//! single tokio task wakes every `interval_ms`, probes all targets
//! concurrently (`GET <path>` with `Connection: close`, success iff
//! 200 within 5 s), and feeds outcomes through a consecutive-threshold
//! state machine. Targets start unhealthy and must pass
//! `succeed_threshold` probes before receiving traffic; a healthy
//! target only flips after `failure_threshold` consecutive failures,
//! so a single outlier probe never changes eligibility.
//!
//! The healthy flag is an `AtomicBool`: the supervisor task is its only
//! writer and `eligible()` readers observe it without locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::Full;
use hyper::header::CONNECTION;
use hyper::StatusCode;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::model::HealthCheckConfig;
use crate::server::{build_http_client, HttpClient};
use crate::target::Target;

/// Probe deadline, fixed by the wire contract.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 200 within the probe timeout.
    Success,
    /// Non-200, connection error, DNS error, or timeout.
    Failure,
}

pub struct HealthSupervisor {
    group: String,
    settings: HealthCheckConfig,
    states: Vec<TargetHealth>,
    shutdown: watch::Sender<bool>,
}

struct TargetHealth {
    id: String,
    healthy: AtomicBool,
    counters: Mutex<Counters>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    successes: u32,
    failures: u32,
}

/// A running supervisor task, shut down cooperatively at process exit.
pub struct SupervisorHandle {
    group: String,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Signal the task to stop and wait a bounded time for in-flight
    /// probes before abandoning it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if tokio::time::timeout(2 * PROBE_TIMEOUT, self.task)
            .await
            .is_err()
        {
            warn!(group = %self.group, "health supervisor did not stop in time, abandoning");
        }
    }
}

impl HealthSupervisor {
    #[must_use]
    pub fn new(group: &str, settings: HealthCheckConfig, targets: &[Arc<Target>]) -> Self {
        let states = targets
            .iter()
            .map(|t| TargetHealth {
                id: t.id().to_string(),
                // Ineligible until it proves itself.
                healthy: AtomicBool::new(false),
                counters: Mutex::new(Counters::default()),
            })
            .collect();

        let (shutdown, _) = watch::channel(false);

        Self {
            group: group.to_string(),
            settings,
            states,
            shutdown,
        }
    }

    /// Lock-free health read, indexed in group target order.
    #[must_use]
    pub fn is_healthy(&self, index: usize) -> bool {
        self.states[index].healthy.load(Ordering::Acquire)
    }

    /// Spawn the probe loop. Probes within one tick run concurrently,
    /// so one slow target cannot starve the others; each probe is
    /// individually bounded by [`PROBE_TIMEOUT`].
    #[must_use]
    pub fn spawn(self: &Arc<Self>, targets: Vec<Arc<Target>>) -> SupervisorHandle {
        let supervisor = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        let task = tokio::spawn(async move {
            let client = build_http_client();
            let mut ticker =
                tokio::time::interval(Duration::from_millis(supervisor.settings.interval_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(
                group = %supervisor.group,
                interval_ms = supervisor.settings.interval_ms,
                path = %supervisor.settings.path,
                "health supervisor started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => {
                        debug!(group = %supervisor.group, "health supervisor shutting down");
                        return;
                    }
                }

                let probes = targets.iter().enumerate().map(|(index, target)| {
                    let client = client.clone();
                    let path = supervisor.settings.path.clone();
                    let target = Arc::clone(target);
                    async move { (index, probe(&client, &target, &path).await) }
                });

                for (index, outcome) in futures::future::join_all(probes).await {
                    supervisor.observe(index, outcome);
                }
            }
        });

        SupervisorHandle {
            group: self.group.clone(),
            shutdown,
            task,
        }
    }

    /// Feed one probe outcome through the state machine. A success
    /// zeroes the failure streak and vice versa, so at any time at
    /// least one counter is zero.
    pub fn observe(&self, index: usize, outcome: ProbeOutcome) {
        let state = &self.states[index];
        let mut counters = state.counters.lock().expect("health counter lock poisoned");

        match outcome {
            ProbeOutcome::Success => {
                counters.failures = 0;
                counters.successes = counters.successes.saturating_add(1);
                if counters.successes >= self.settings.succeed_threshold
                    && !state.healthy.load(Ordering::Acquire)
                {
                    state.healthy.store(true, Ordering::Release);
                    info!(
                        group = %self.group,
                        target = %state.id,
                        consecutive = counters.successes,
                        "target healthy"
                    );
                }
            }
            ProbeOutcome::Failure => {
                counters.successes = 0;
                counters.failures = counters.failures.saturating_add(1);
                if counters.failures >= self.settings.failure_threshold
                    && state.healthy.load(Ordering::Acquire)
                {
                    state.healthy.store(false, Ordering::Release);
                    warn!(
                        group = %self.group,
                        target = %state.id,
                        consecutive = counters.failures,
                        "target unhealthy"
                    );
                }
            }
        }
    }
}

async fn probe(client: &HttpClient, target: &Target, path: &str) -> ProbeOutcome {
    let uri = format!("http://{}{path}", target.addr());

    let request = match hyper::Request::get(uri)
        .header(CONNECTION, "close")
        .body(Full::default())
    {
        Ok(request) => request,
        Err(_) => return ProbeOutcome::Failure,
    };

    match tokio::time::timeout(PROBE_TIMEOUT, client.request(request)).await {
        Ok(Ok(response)) if response.status() == StatusCode::OK => ProbeOutcome::Success,
        Ok(Ok(_)) | Ok(Err(_)) | Err(_) => ProbeOutcome::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(succeed: u32, fail: u32) -> HealthSupervisor {
        let targets = vec![Arc::new(Target::new(
            "127.0.0.1:8081".parse().unwrap(),
            None,
            1,
        ))];
        let settings = HealthCheckConfig {
            succeed_threshold: succeed,
            failure_threshold: fail,
            ..HealthCheckConfig::default()
        };
        HealthSupervisor::new("test", settings, &targets)
    }

    #[test]
    fn targets_start_ineligible() {
        let sup = supervisor(2, 2);
        assert!(!sup.is_healthy(0));
    }

    #[test]
    fn healthy_after_consecutive_successes() {
        let sup = supervisor(2, 2);

        sup.observe(0, ProbeOutcome::Success);
        assert!(!sup.is_healthy(0));

        sup.observe(0, ProbeOutcome::Success);
        assert!(sup.is_healthy(0));
    }

    #[test]
    fn threshold_of_one_flips_on_first_probe() {
        let sup = supervisor(1, 1);

        sup.observe(0, ProbeOutcome::Success);
        assert!(sup.is_healthy(0));

        sup.observe(0, ProbeOutcome::Failure);
        assert!(!sup.is_healthy(0));
    }

    #[test]
    fn failure_resets_the_success_streak() {
        let sup = supervisor(2, 2);

        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Failure);
        sup.observe(0, ProbeOutcome::Success);
        assert!(!sup.is_healthy(0), "streak was broken, must not flip");

        sup.observe(0, ProbeOutcome::Success);
        assert!(sup.is_healthy(0));
    }

    #[test]
    fn single_outlier_does_not_unflip_a_healthy_target() {
        let sup = supervisor(2, 2);
        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Success);
        assert!(sup.is_healthy(0));

        sup.observe(0, ProbeOutcome::Failure);
        assert!(sup.is_healthy(0));

        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Failure);
        assert!(sup.is_healthy(0));
    }

    #[test]
    fn unhealthy_after_consecutive_failures() {
        let sup = supervisor(2, 2);
        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Success);

        sup.observe(0, ProbeOutcome::Failure);
        sup.observe(0, ProbeOutcome::Failure);
        assert!(!sup.is_healthy(0));
    }

    #[test]
    fn recovery_after_cutover() {
        let sup = supervisor(2, 2);
        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Failure);
        sup.observe(0, ProbeOutcome::Failure);
        assert!(!sup.is_healthy(0));

        sup.observe(0, ProbeOutcome::Success);
        sup.observe(0, ProbeOutcome::Success);
        assert!(sup.is_healthy(0));
    }
}
