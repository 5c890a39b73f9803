//! The orchestrator seam consumed by the crafting tree, plus the shared
//! pause/cancel state that lets a host suspend or abort a long resolution.

use crate::catalog::RecipeDetails;
use crate::error::CraftError;
use crate::item::ItemStack;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Services the tree needs from whoever runs it.
pub trait ResolutionContext {
    /// Cooperative checkpoint, called on every recursive descent. May block
    /// while paused; fails with [`CraftError::Cancelled`] once cancelled.
    fn check_pause_or_cancel(&mut self) -> Result<(), CraftError>;

    fn record_missing(&mut self, stack: ItemStack);

    fn record_cost(&mut self, units: u64);

    /// Return previously claimed units to the shared pool.
    fn refund(&mut self, stack: ItemStack);

    /// Claim units that were just extracted. Returns the portion that may be
    /// logged as real stock usage, or `None` if none of it may.
    fn check_use(&mut self, stack: ItemStack) -> Option<ItemStack>;

    /// A recipe will run `runs` times at tree depth `depth`.
    fn record_task(&mut self, _recipe: &RecipeDetails, _runs: u64, _depth: usize) {}
}

#[derive(Debug, Default)]
struct ControlState {
    cancelled: AtomicBool,
    paused: Mutex<bool>,
    wake: Condvar,
}

/// Pause/resume/cancel switch shared between a job and its host.
#[derive(Debug, Clone, Default)]
pub struct JobHandle {
    state: Arc<ControlState>,
}

impl JobHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        *self.state.paused.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn resume(&self) {
        *self.state.paused.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.state.wake.notify_all();
    }

    pub fn cancel(&self) {
        // Held so a checkpoint cannot miss the wakeup between check and wait.
        let _paused = self.state.paused.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        *self.state.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while paused. Returns `Err(Cancelled)` if cancelled before or
    /// during the wait.
    pub fn checkpoint(&self) -> Result<(), CraftError> {
        let mut paused = self.state.paused.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_cancelled() {
                return Err(CraftError::Cancelled);
            }
            if !*paused {
                return Ok(());
            }
            tracing::debug!("resolution paused");
            paused = self
                .state
                .wake
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
