//! # Task System Core Traits
//!
//! This module defines the unit of work driven by the worker pool.
//!
//! ## Core Components
//! - `Task`: A long-lived, restartable piece of background work
//! - `TaskStatus`: What a single pass of a task achieved
//!
//! ## Task Lifecycle
//! 1. A `Task` is handed to `TaskManager::spawn()` and moved onto its own thread
//! 2. The worker calls `process()` in a loop
//! 3. After an `Idle` pass the worker sleeps until woken or the idle wait elapses
//! 4. When the manager shuts down the loop ends and the task is dropped on the worker
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to its worker thread
//! - All shared state must be properly synchronized

/// Outcome of one [`Task::process`] pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Work was done; the worker polls again immediately.
    Progressed,
    /// Nothing to do right now; the worker waits before polling again.
    Idle,
}

/// A unit of background work polled by a dedicated worker thread.
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred between threads
/// - A pass should be short so shutdown requests are noticed promptly
/// - Should avoid holding locks across passes
pub trait Task: Send + 'static {
    /// Prefix for the worker thread name.
    fn name(&self) -> &str;

    /// Performs one bounded slice of work.
    ///
    /// # Implementation Notes
    /// - Should handle errors internally and log them
    /// - Returning `Idle` while work remains only delays it by the idle wait
    fn process(&mut self) -> TaskStatus;
}
