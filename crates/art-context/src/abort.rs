//! Cooperative cancellation shared by a root run and all of its nested runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag. Cloning shares the same underlying flag:
/// firing it on any clone is observed by every clone, which is how a root
/// cancellation propagates to nested `AgentAsTool` children without each
/// layer needing to forward the signal explicitly.
#[derive(Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_is_observed_by_clones() {
        let signal = AbortSignal::new();
        let child = signal.clone();
        assert!(!child.is_aborted());
        signal.fire();
        assert!(child.is_aborted());
    }
}
