//! Smooth weighted round-robin.
//!
//! The nginx smoothing scheme: every pick adds each candidate's
//! configured weight to its running current-weight, selects the largest,
//! and subtracts the total effective weight from the winner. Over any
//! window of `Σ weights` consecutive picks against a stable eligible
//! set, each target appears exactly its weight's worth of times, with
//! no bursts. Ineligible targets contribute an effective weight of 0:
//! they are skipped and their current-weight is frozen until they
//! return.

use std::sync::{Arc, Mutex};

use super::{PickContext, SelectionPolicy};
use crate::target::Target;

pub struct SmoothWeighted {
    /// (target id, configured weight) in declaration order.
    weights: Vec<(String, u32)>,
    current: Mutex<Vec<i64>>,
}

impl SmoothWeighted {
    /// `targets` is the group's full target list; each target carries
    /// the weight resolved from the group's weight map.
    #[must_use]
    pub fn new(targets: &[Arc<Target>]) -> Self {
        let weights = targets
            .iter()
            .map(|t| (t.id().to_string(), t.weight()))
            .collect::<Vec<_>>();
        let current = Mutex::new(vec![0; weights.len()]);
        Self { weights, current }
    }
}

impl SelectionPolicy for SmoothWeighted {
    fn pick(&self, eligible: &[Arc<Target>], _ctx: &PickContext<'_>) -> Option<Arc<Target>> {
        let mut current = self.current.lock().expect("weight state lock poisoned");

        let mut total: i64 = 0;
        let mut best: Option<usize> = None;

        for (i, (id, weight)) in self.weights.iter().enumerate() {
            if !eligible.iter().any(|t| t.id() == id.as_str()) {
                continue;
            }

            current[i] += i64::from(*weight);
            total += i64::from(*weight);

            // Strict comparison keeps the first-declared target on ties.
            match best {
                Some(b) if current[i] <= current[b] => {}
                _ => best = Some(i),
            }
        }

        let winner = best?;
        if total == 0 {
            return None;
        }
        current[winner] -= total;

        let winner_id = self.weights[winner].0.as_str();
        eligible.iter().find(|t| t.id() == winner_id).cloned()
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
