// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-size worker pool for the resolve phase.
//!
//! Thread count is fixed at construction. Tasks are nullary closures;
//! [`WorkerPool::wait_all`] is the per-tick barrier. A panicking task is
//! contained to that task: the worker survives, the barrier still
//! releases, and the tick proceeds with whatever resolved. Shutdown
//! (on drop) drains the queue and joins every worker.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::warn;

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Why the pool could not be constructed.
#[derive(Debug, Error)]
pub(crate) enum PoolError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Default)]
struct PoolState {
    tasks: VecDeque<Task>,
    /// Tasks submitted and not yet completed (queued or running).
    active: usize,
    stop: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    task_ready: Condvar,
    all_done: Condvar,
}

pub(crate) struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

fn lock(shared: &PoolShared) -> MutexGuard<'_, PoolState> {
    shared.state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorkerPool {
    /// Spawns `thread_count` workers. On a spawn failure the partially
    /// built pool is torn down and the error is returned.
    pub(crate) fn new(thread_count: u32) -> Result<Self, PoolError> {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState::default()),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
        });
        let mut workers = Vec::with_capacity(thread_count as usize);
        for index in 0..thread_count {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("chronon-worker-{index}"))
                .spawn(move || worker_loop(&worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    Self::shutdown(&shared, &mut workers);
                    return Err(PoolError::Spawn(err));
                }
            }
        }
        Ok(Self { shared, workers })
    }

    /// Queues a task for execution.
    pub(crate) fn submit(&self, task: Task) {
        {
            let mut state = lock(&self.shared);
            state.tasks.push_back(task);
            state.active += 1;
        }
        self.shared.task_ready.notify_one();
    }

    /// Blocks until every submitted task has completed.
    pub(crate) fn wait_all(&self) {
        let mut state = lock(&self.shared);
        while state.active > 0 {
            state = self
                .shared
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn thread_count(&self) -> usize {
        self.workers.len()
    }

    fn shutdown(shared: &PoolShared, workers: &mut Vec<JoinHandle<()>>) {
        {
            let mut state = lock(shared);
            state.stop = true;
        }
        shared.task_ready.notify_all();
        for handle in workers.drain(..) {
            // A worker that panicked outside a task has already been
            // contained; nothing useful to do with the join result.
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        Self::shutdown(&self.shared, &mut self.workers);
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let task = {
            let mut state = lock(shared);
            loop {
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }
                if state.stop {
                    return;
                }
                state = shared
                    .task_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            warn!("worker task panicked; group left unresolved");
        }
        let mut state = lock(shared);
        state.active -= 1;
        if state.active == 0 {
            shared.all_done.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_submitted_task() {
        let pool = match WorkerPool::new(4) {
            Ok(pool) => pool,
            Err(err) => panic!("pool construction failed: {err}"),
        };
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..64 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 64);
        assert_eq!(pool.thread_count(), 4);
    }

    #[test]
    fn wait_all_with_no_tasks_returns_immediately() {
        let pool = match WorkerPool::new(1) {
            Ok(pool) => pool,
            Err(err) => panic!("pool construction failed: {err}"),
        };
        pool.wait_all();
    }

    #[test]
    fn panicking_task_does_not_break_the_barrier() {
        let pool = match WorkerPool::new(2) {
            Ok(pool) => pool,
            Err(err) => panic!("pool construction failed: {err}"),
        };
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit(Box::new(|| panic!("intentional")));
        let survivor = Arc::clone(&counter);
        pool.submit(Box::new(move || {
            survivor.fetch_add(1, Ordering::SeqCst);
        }));
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
