//! Least-response-time selection.
//!
//! Scores each eligible target as `active_connections × avg_ttfb_ms`
//! and picks the minimum. Targets with no TTFB samples score 0, so
//! cold targets soak up traffic until they have a measured average.
//! Ties resolve to the first-declared target.

use std::sync::Arc;

use super::{PickContext, SelectionPolicy};
use crate::target::Target;

pub struct LeastResponseTime;

impl LeastResponseTime {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for LeastResponseTime {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for LeastResponseTime {
    fn pick(&self, eligible: &[Arc<Target>], _ctx: &PickContext<'_>) -> Option<Arc<Target>> {
        // min_by keeps the first of equal elements, which is the
        // declaration-order tie break.
        eligible
            .iter()
            .min_by(|a, b| a.load_score().total_cmp(&b.load_score()))
            .cloned()
    }

    fn name(&self) -> &'static str {
        "least_response_time"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{targets, CTX};
    use super::*;

    fn warm(target: &Arc<Target>, ttfb_ms: f64, leave_active: usize) {
        target.begin_request();
        target.end_request(Some(ttfb_ms));
        for _ in 0..leave_active {
            target.begin_request();
        }
    }

    #[test]
    fn picks_the_lowest_score() {
        let pool = targets(&[1, 1, 1]);
        warm(&pool[0], 100.0, 4); // 400
        warm(&pool[1], 50.0, 2); // 100
        warm(&pool[2], 300.0, 1); // 300

        let lrt = LeastResponseTime::new();
        assert_eq!(lrt.pick(&pool, &CTX).unwrap().id(), pool[1].id());
    }

    #[test]
    fn cold_target_is_preferred() {
        let pool = targets(&[1, 1]);
        warm(&pool[0], 5.0, 1);

        let lrt = LeastResponseTime::new();
        assert_eq!(lrt.pick(&pool, &CTX).unwrap().id(), pool[1].id());
    }

    #[test]
    fn tie_resolves_to_first_declared() {
        let pool = targets(&[1, 1, 1]);

        let lrt = LeastResponseTime::new();
        assert_eq!(lrt.pick(&pool, &CTX).unwrap().id(), pool[0].id());
    }

    #[test]
    fn idle_warm_target_beats_busy_warm_target() {
        let pool = targets(&[1, 1]);
        warm(&pool[0], 100.0, 3); // 300
        warm(&pool[1], 100.0, 0); // 0 active -> score 0

        let lrt = LeastResponseTime::new();
        assert_eq!(lrt.pick(&pool, &CTX).unwrap().id(), pool[1].id());
    }

    #[test]
    fn empty_eligible_set_yields_none() {
        let lrt = LeastResponseTime::new();
        assert!(lrt.pick(&[], &CTX).is_none());
    }
}
