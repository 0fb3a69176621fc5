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

//! Process-wide bookkeeping of live workers.
//!
//! The registry is an explicit collaborator, not ambient global state: the
//! embedding application creates one and hands it to every
//! [`Worker`](crate::Worker) at construction. Its single job beyond ownership
//! is the start barrier — when a worker enters its loop it announces itself
//! here, and the registry clears it from every other worker's waiting list.

use crate::worker::{Worker, WorkerId};
use std::sync::{Arc, Mutex};

/// Registry of all live [`Worker`]s sharing one start-ordering domain.
///
/// The registry owns its workers: it is the arena a self-destructing worker
/// releases itself from when its loop exits. Callers hold it behind an `Arc`
/// so workers can keep a weak back-reference.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Mutex<Vec<Arc<Worker>>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a freshly constructed worker. Called by [`Worker::new`].
    pub(crate) fn register(&self, worker: Arc<Worker>) {
        self.workers.lock().unwrap().push(worker);
    }

    /// Removes the worker with the given id, returning its `Arc` if it was
    /// registered. For a self-destructing worker this happens automatically
    /// when its loop exits.
    pub fn remove(&self, id: WorkerId) -> Option<Arc<Worker>> {
        let mut workers = self.workers.lock().unwrap();
        let index = workers.iter().position(|w| w.id() == id)?;
        Some(workers.swap_remove(index))
    }

    /// Returns the worker with the given name, if any is registered.
    pub fn find(&self, name: &str) -> Option<Arc<Worker>> {
        let workers = self.workers.lock().unwrap();
        workers.iter().find(|w| w.name() == name).cloned()
    }

    /// Returns the number of live workers.
    pub fn len(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    /// Returns `true` if no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.lock().unwrap().is_empty()
    }

    /// Clears `id` from every registered worker's waiting list.
    ///
    /// Called by a worker's own thread the moment it enters the running
    /// state. The scan is linear in the number of live workers, a start-time
    /// cost only. The registry lock is dropped before the waiting lists are
    /// touched so it is never held across another worker's lock.
    pub(crate) fn announce_started(&self, id: WorkerId) {
        let workers: Vec<_> = self.workers.lock().unwrap().to_vec();
        for worker in &workers {
            worker.clear_waiting(id);
        }
        log::debug!("announced worker start to {} live workers", workers.len());
    }
}
