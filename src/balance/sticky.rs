//! Sticky sessions: a client fingerprint pins to one target for the
//! session TTL.
//!
//! Sessions are process-local; running multiple instances without a
//! shared store is tolerated, but affinity then only holds per
//! instance. A hit refreshes the expiry; a miss, an expired entry, or a
//! pinned target that has left the eligible set falls back to an
//! embedded round-robin pick and re-pins. Expired entries are reaped
//! lazily on access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{PickContext, SelectionPolicy};
use crate::target::Target;

pub struct Sticky {
    ttl: Duration,
    fallback: AtomicUsize,
    sessions: Mutex<HashMap<String, Session>>,
}

#[derive(Debug, Clone)]
struct Session {
    target_id: String,
    expires_at: Instant,
}

impl Sticky {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            fallback: AtomicUsize::new(0),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.sessions.lock().expect("session lock poisoned").len()
    }
}

impl SelectionPolicy for Sticky {
    fn pick(&self, eligible: &[Arc<Target>], ctx: &PickContext<'_>) -> Option<Arc<Target>> {
        if eligible.is_empty() {
            return None;
        }

        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session lock poisoned");

        if let Some(session) = sessions.get_mut(ctx.fingerprint) {
            if session.expires_at > now {
                if let Some(target) = eligible.iter().find(|t| t.id() == session.target_id) {
                    session.expires_at = now + self.ttl;
                    return Some(target.clone());
                }
            }
        }

        sessions.retain(|_, s| s.expires_at > now);

        let index = self.fallback.fetch_add(1, Ordering::Relaxed) % eligible.len();
        let target = &eligible[index];
        sessions.insert(
            ctx.fingerprint.to_string(),
            Session {
                target_id: target.id().to_string(),
                expires_at: now + self.ttl,
            },
        );

        Some(target.clone())
    }

    fn name(&self) -> &'static str {
        "sticky"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::targets;
    use super::*;

    const TTL: Duration = Duration::from_millis(50);

    fn ctx(fingerprint: &str) -> PickContext<'_> {
        PickContext { fingerprint }
    }

    #[test]
    fn same_fingerprint_pins_to_one_target() {
        let pool = targets(&[1, 1, 1]);
        let sticky = Sticky::new(Duration::from_secs(10));

        let first = sticky.pick(&pool, &ctx("192.168.1.100")).unwrap();
        for _ in 0..4 {
            let again = sticky.pick(&pool, &ctx("192.168.1.100")).unwrap();
            assert_eq!(again.id(), first.id());
        }
    }

    #[test]
    fn distinct_fingerprints_pin_independently() {
        let pool = targets(&[1, 1, 1]);
        let sticky = Sticky::new(Duration::from_secs(10));

        let a = sticky.pick(&pool, &ctx("192.168.1.101")).unwrap();
        let b = sticky.pick(&pool, &ctx("192.168.1.102")).unwrap();

        // The embedded round-robin hands out consecutive targets.
        assert_ne!(a.id(), b.id());

        assert_eq!(sticky.pick(&pool, &ctx("192.168.1.101")).unwrap().id(), a.id());
        assert_eq!(sticky.pick(&pool, &ctx("192.168.1.102")).unwrap().id(), b.id());
    }

    #[test]
    fn expired_session_repins() {
        let pool = targets(&[1, 1, 1]);
        let sticky = Sticky::new(TTL);

        let first = sticky.pick(&pool, &ctx("c")).unwrap();
        std::thread::sleep(TTL + Duration::from_millis(10));

        let second = sticky.pick(&pool, &ctx("c")).unwrap();
        // May or may not land on the same target, but it pins again.
        let third = sticky.pick(&pool, &ctx("c")).unwrap();
        assert_eq!(second.id(), third.id());

        let _ = first;
    }

    #[test]
    fn hit_refreshes_expiry() {
        let pool = targets(&[1, 1]);
        let sticky = Sticky::new(TTL);

        let first = sticky.pick(&pool, &ctx("c")).unwrap();

        // Keep touching the session at sub-TTL intervals; it must
        // survive well past the original TTL.
        for _ in 0..4 {
            std::thread::sleep(TTL / 2);
            let again = sticky.pick(&pool, &ctx("c")).unwrap();
            assert_eq!(again.id(), first.id());
        }
    }

    #[test]
    fn unhealthy_pinned_target_is_replaced() {
        let pool = targets(&[1, 1, 1]);
        let sticky = Sticky::new(Duration::from_secs(10));

        let pinned = sticky.pick(&pool, &ctx("c")).unwrap();

        let remaining: Vec<_> = pool
            .iter()
            .filter(|t| t.id() != pinned.id())
            .cloned()
            .collect();

        let replacement = sticky.pick(&remaining, &ctx("c")).unwrap();
        assert_ne!(replacement.id(), pinned.id());

        // And the replacement is itself sticky now.
        let again = sticky.pick(&remaining, &ctx("c")).unwrap();
        assert_eq!(again.id(), replacement.id());
    }

    #[test]
    fn expired_entries_are_reaped_on_access() {
        let pool = targets(&[1, 1]);
        let sticky = Sticky::new(TTL);

        for i in 0..5 {
            sticky.pick(&pool, &ctx(&format!("client-{i}"))).unwrap();
        }
        assert_eq!(sticky.session_count(), 5);

        std::thread::sleep(TTL + Duration::from_millis(10));
        sticky.pick(&pool, &ctx("fresh")).unwrap();

        assert_eq!(sticky.session_count(), 1);
    }

    #[test]
    fn empty_eligible_set_yields_none() {
        let sticky = Sticky::new(TTL);
        assert!(sticky.pick(&[], &ctx("c")).is_none());
    }
}
