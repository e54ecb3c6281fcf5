//! Deferred continuations on the host's idle tick.
//!
//! Some hosts only apply a panel's new contents after the panel repaints, so
//! part of a rotation update has to run "later, on the main thread". The engine
//! hands that work to an [`IdleQueue`]; the host decides when "later" is.
//! [`DeferredQueue`] is a ready-made FIFO a host can drain from its own idle
//! loop.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A unit of deferred main-thread work.
pub type DeferredTask = Box<dyn FnOnce()>;

/// Schedules work to run after the current host event has finished.
pub trait IdleQueue {
    fn defer(&self, task: DeferredTask);
}

/// FIFO idle queue drained explicitly by the host.
#[derive(Default)]
pub struct DeferredQueue {
    tasks: RefCell<VecDeque<DeferredTask>>,
}

impl DeferredQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run every task queued before this call. Tasks deferred while draining
    /// wait for the next call. Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<DeferredTask> = self.tasks.borrow_mut().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Drop queued tasks without running them.
    pub fn discard(&self) -> usize {
        let mut tasks = self.tasks.borrow_mut();
        let count = tasks.len();
        tasks.clear();
        count
    }
}

impl IdleQueue for DeferredQueue {
    fn defer(&self, task: DeferredTask) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
