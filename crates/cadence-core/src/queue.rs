// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Double-buffered FIFO task queue.
//!
//! Producers append to the *back* buffer under a short-held lock. Once per
//! queue-processing pass the consumer swaps the buffer roles under the same
//! lock and then runs everything in the *front* buffer with the producer lock
//! released, so task execution never blocks submission.

use std::collections::VecDeque;
use std::mem;
use std::sync::Mutex;

/// A zero-argument unit of work executed on the worker's thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The per-worker double-buffered task queue.
///
/// Single-consumer: only the owning worker's thread may call
/// [`drain`](TaskQueue::drain). The front buffer has its own lock, but that
/// lock is never contended; it exists only to keep the type `Sync` while the
/// buffer roles swap.
pub(crate) struct TaskQueue {
    back: Mutex<VecDeque<Task>>,
    front: Mutex<VecDeque<Task>>,
    warn_threshold: usize,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.back.lock().unwrap().len())
            .field("warn_threshold", &self.warn_threshold)
            .finish_non_exhaustive()
    }
}

impl TaskQueue {
    pub fn new(warn_threshold: usize) -> Self {
        Self {
            back: Mutex::new(VecDeque::new()),
            front: Mutex::new(VecDeque::new()),
            warn_threshold,
        }
    }

    /// Appends a task to the back buffer. Callable from any thread.
    pub fn push(&self, task: Task) {
        self.back.lock().unwrap().push_back(task);
    }

    /// Returns `true` if the back buffer currently holds no tasks.
    pub fn is_back_empty(&self) -> bool {
        self.back.lock().unwrap().is_empty()
    }

    /// Swaps the buffer roles and runs every task that was in the back
    /// buffer, in FIFO order. Returns the number of tasks executed.
    ///
    /// If the back buffer exceeded the warning threshold, a diagnostic is
    /// logged; no task is ever dropped. Tasks submitted while a drain is in
    /// progress land in the new back buffer and run in the next drain.
    ///
    /// A panicking task is not caught here; it unwinds the worker thread.
    pub fn drain(&self, owner: &str) -> usize {
        let mut front = self.front.lock().unwrap();
        {
            let mut back = self.back.lock().unwrap();
            if back.len() > self.warn_threshold {
                log::warn!(
                    "[{owner}] task queue is over its threshold: {}/{}",
                    back.len(),
                    self.warn_threshold
                );
            }
            mem::swap(&mut *front, &mut *back);
        }

        let mut executed = 0;
        while let Some(task) = front.pop_front() {
            task();
            executed += 1;
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn drain_runs_tasks_in_submission_order() {
        let queue = TaskQueue::new(16);
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5 {
            let order = Arc::clone(&order);
            queue.push(Box::new(move || order.lock().unwrap().push(n)));
        }

        assert_eq!(queue.drain("test"), 5);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn drain_on_empty_queue_is_a_no_op() {
        let queue = TaskQueue::new(16);
        assert_eq!(queue.drain("test"), 0);
        assert!(queue.is_back_empty());
    }

    #[test]
    fn tasks_submitted_during_a_drain_wait_for_the_next_one() {
        let queue = Arc::new(TaskQueue::new(16));
        let late = Arc::new(AtomicUsize::new(0));

        let queue_inner = Arc::clone(&queue);
        let late_inner = Arc::clone(&late);
        queue.push(Box::new(move || {
            let late = Arc::clone(&late_inner);
            queue_inner.push(Box::new(move || {
                late.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(queue.drain("test"), 1);
        assert_eq!(late.load(Ordering::SeqCst), 0, "resubmitted task ran early");
        assert_eq!(queue.drain("test"), 1);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exceeding_the_threshold_still_runs_every_task() {
        let queue = TaskQueue::new(2);
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let count = Arc::clone(&count);
            queue.push(Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(queue.drain("test"), 10);
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}
