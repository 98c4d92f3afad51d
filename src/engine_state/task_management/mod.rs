//! # Task Management System
//!
//! This module provides the worker pool that drives background work such as
//! region generation and mesh building.
//!
//! ## Architecture Overview
//!
//! The task management system consists of two key components:
//! - `TaskManager`: Owns the worker threads and their shutdown signal
//! - `Task`: A long-lived unit of work polled in a loop by one worker
//!
//! Unlike a job queue, every worker owns exactly one task for its whole
//! lifetime. The task decides on each pass what to work on next, so there is
//! no central queue to fill or drain.
//!
//! ## Worker Lifecycle
//! 1. `TaskManager::spawn()` starts a named thread for the task
//! 2. The worker calls `Task::process()` until shutdown is requested
//! 3. Idle passes park the worker on a shared condition variable with a timeout
//! 4. `wake_all()` cuts idle waits short after new work becomes available
//! 5. Dropping the manager requests shutdown, wakes every worker and joins them
//!
//! ## Performance Considerations
//! - **Idle Wait**: Bounds how long new work can go unnoticed without a wake-up
//! - **Task Granularity**: Short passes keep shutdown latency low
//! - **Blocking**: Avoid blocking operations in tasks that could delay shutdown
//!
//! ## Example Usage
//! ```rust
//! use std::time::Duration;
//! use voxel_world::engine_state::task_management::{task::{Task, TaskStatus}, TaskManager};
//!
//! struct Countdown(u32);
//!
//! impl Task for Countdown {
//!     fn name(&self) -> &str {
//!         "countdown"
//!     }
//!
//!     fn process(&mut self) -> TaskStatus {
//!         if self.0 == 0 {
//!             return TaskStatus::Idle;
//!         }
//!         self.0 -= 1;
//!         TaskStatus::Progressed
//!     }
//! }
//!
//! let mut manager = TaskManager::new(Duration::from_millis(5));
//! manager.spawn(Countdown(10)).unwrap();
//! assert_eq!(manager.worker_count(), 1);
//! manager.shutdown();
//! ```

pub mod task;

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::info;
use web_time::Duration;

use crate::error::TaskError;
use task::{Task, TaskStatus};

#[derive(Default)]
struct SignalState {
    shutdown: bool,
    /// Bumped by every `wake_all` so sleepers can tell a wake-up from a spurious return.
    wake_epoch: u64,
}

/// Shutdown flag and wake-up channel shared by all workers of a manager.
#[derive(Default)]
struct WorkerSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl WorkerSignal {
    fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }

    /// Blocks until woken, shut down, or `timeout` elapses.
    fn wait(&self, timeout: Duration) {
        let state = self.state.lock().unwrap();
        if state.shutdown {
            return;
        }
        let epoch = state.wake_epoch;
        let _unused = self
            .condvar
            .wait_timeout_while(state, timeout, |state| {
                !state.shutdown && state.wake_epoch == epoch
            })
            .unwrap();
    }

    fn wake_all(&self) {
        self.state.lock().unwrap().wake_epoch += 1;
        self.condvar.notify_all();
    }

    fn request_shutdown(&self) {
        self.state.lock().unwrap().shutdown = true;
        self.condvar.notify_all();
    }
}

/// Manages a pool of worker threads, one per task.
///
/// The `TaskManager` is responsible for:
/// - Creating named worker threads
/// - Waking idle workers when new work is available
/// - Stopping and joining every worker on shutdown
///
/// # Implementation Notes
/// - Drop-safe: Dropping the manager stops and joins its workers
/// - Panic-safe: A panicking task ends only its own worker; the panic is logged on join
pub struct TaskManager {
    workers: Vec<JoinHandle<()>>,
    signal: Arc<WorkerSignal>,
    idle_wait: Duration,
}

impl TaskManager {
    /// Creates a manager without workers.
    ///
    /// # Arguments
    /// * `idle_wait` - Longest time a worker sleeps after an idle pass
    pub fn new(idle_wait: Duration) -> Self {
        info!(
            "Available parallelism: {:?}",
            thread::available_parallelism()
        );
        TaskManager {
            workers: Vec::new(),
            signal: Arc::new(WorkerSignal::default()),
            idle_wait,
        }
    }

    /// Starts a worker thread that polls `task` until shutdown.
    ///
    /// # Errors
    /// [`TaskError::Spawn`] if the operating system refuses a new thread.
    pub fn spawn<T: Task>(&mut self, mut task: T) -> Result<(), TaskError> {
        let name = format!("{}-{}", task.name(), self.workers.len());
        let signal = self.signal.clone();
        let idle_wait = self.idle_wait;

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::debug!("worker {} started", task.name());
                while !signal.is_shutdown() {
                    match task.process() {
                        TaskStatus::Progressed => thread::yield_now(),
                        TaskStatus::Idle => signal.wait(idle_wait),
                    }
                }
                log::debug!("worker {} stopped", task.name());
            })
            .map_err(|source| TaskError::Spawn { name, source })?;

        self.workers.push(worker);
        Ok(())
    }

    /// Number of workers started and not yet joined.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Interrupts the idle wait of every worker.
    pub fn wake_all(&self) {
        self.signal.wake_all();
    }

    /// Stops every worker and waits for the current passes to finish.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.signal.request_shutdown();
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_owned();
            if worker.join().is_err() {
                log::error!("worker {name} panicked");
            }
        }
        info!("all workers stopped");
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
