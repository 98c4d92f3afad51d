//! # Main-Thread Dispatch
//!
//! Worker threads produce artifacts (meshes, collision shapes) that must be
//! attached to objects owned by a single thread. They hand those artifacts
//! over as boxed closures; the owning thread drains the queue once per frame.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use crate::error::DispatchError;

/// A unit of work to run on the owning thread.
pub type MainThreadAction = Box<dyn FnOnce() + Send + 'static>;

/// Capability for marshalling work onto the thread that owns the scene.
pub trait MainThreadDispatch: Send + Sync {
    /// Enqueues `action` for the next drain of the owning thread.
    fn schedule(&self, action: MainThreadAction);

    /// Runs `action` immediately when called on the owning thread,
    /// otherwise behaves like [`schedule`](Self::schedule).
    fn run_or_schedule(&self, action: MainThreadAction);
}

/// FIFO queue of actions bound to the thread that created it.
pub struct MainThreadQueue {
    owner: ThreadId,
    actions: Mutex<VecDeque<MainThreadAction>>,
}

impl MainThreadQueue {
    /// Creates a queue owned by the calling thread.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            actions: Mutex::new(VecDeque::new()),
        }
    }

    /// Whether the caller is the owning thread.
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Number of actions waiting to run.
    pub fn pending(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Runs every queued action in submission order and returns how many ran.
    ///
    /// Actions scheduled while draining run on the next call.
    ///
    /// # Errors
    /// [`DispatchError::WrongThread`] when called off the owning thread.
    pub fn process(&self) -> Result<usize, DispatchError> {
        if !self.is_owner_thread() {
            return Err(DispatchError::WrongThread);
        }

        let drained: Vec<MainThreadAction> = self.actions.lock().unwrap().drain(..).collect();
        let count = drained.len();
        for action in drained {
            action();
        }
        Ok(count)
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadDispatch for MainThreadQueue {
    fn schedule(&self, action: MainThreadAction) {
        self.actions.lock().unwrap().push_back(action);
    }

    fn run_or_schedule(&self, action: MainThreadAction) {
        if self.is_owner_thread() {
            action();
        } else {
            self.schedule(action);
        }
    }
}
