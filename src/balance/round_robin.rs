//! Round-robin selection: a shared atomic counter indexes the eligible
//! snapshot modulo its size.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{PickContext, SelectionPolicy};
use crate::target::Target;

pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for RoundRobin {
    fn pick(&self, eligible: &[Arc<Target>], _ctx: &PickContext<'_>) -> Option<Arc<Target>> {
        if eligible.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % eligible.len();
        Some(eligible[index].clone())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
