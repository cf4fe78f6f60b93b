//! Single-assignment slot for an in-flight compilation.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::entry::CompilerCacheResult;

#[derive(Debug)]
enum PendingState {
    Running,
    Done(Arc<CompilerCacheResult>),
    /// The builder panicked; waiters retry.
    Abandoned,
}

/// Completion handle shared by the builder and its waiters.
#[derive(Debug)]
pub struct PendingCompilation {
    state: Mutex<PendingState>,
    ready: Condvar,
}

impl PendingCompilation {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PendingState::Running),
            ready: Condvar::new(),
        }
    }

    /// Block until the builder finishes. `None` if it was abandoned.
    pub fn wait(&self) -> Option<Arc<CompilerCacheResult>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                PendingState::Running => self.ready.wait(&mut state),
                PendingState::Done(result) => return Some(Arc::clone(result)),
                PendingState::Abandoned => return None,
            }
        }
    }

    pub fn complete(&self, result: Arc<CompilerCacheResult>) {
        *self.state.lock() = PendingState::Done(result);
        self.ready.notify_all();
    }

    pub fn abandon(&self) {
        *self.state.lock() = PendingState::Abandoned;
        self.ready.notify_all();
    }
}

impl Default for PendingCompilation {
    fn default() -> Self {
        Self::new()
    }
}
