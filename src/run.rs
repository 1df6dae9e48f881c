//! Run generations: a newer conversion supersedes an older one.
//!
//! There is no cancel button. Starting a run through a [`RunTracker`] bumps a
//! shared generation counter; every older [`RunToken`] immediately reports
//! [`RunToken::is_current`] as `false`. The pipeline checks its token before
//! each page and before handing back results, so a superseded run stops at
//! the next page boundary and commits nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out run tokens. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    generation: Arc<AtomicU64>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding every token issued before.
    pub fn begin(&self) -> RunToken {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RunToken {
            id,
            generation: Arc::clone(&self.generation),
        }
    }

    /// Supersede every outstanding token without starting a new run.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The most recently issued generation (0 before the first run).
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Identity of one run.
#[derive(Debug, Clone)]
pub struct RunToken {
    id: u64,
    generation: Arc<AtomicU64>,
}

impl RunToken {
    /// A token that is never superseded, for one-off conversions.
    pub fn detached() -> Self {
        RunTracker::new().begin()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// `false` once a newer run has begun.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.id
    }
}
