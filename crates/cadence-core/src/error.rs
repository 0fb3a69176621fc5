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

//! Error types for worker lifecycle operations.

use std::fmt;
use std::io;

/// An error starting a [`Worker`](crate::Worker).
#[derive(Debug)]
pub enum WorkerError {
    /// `start` was called on a worker that has already been started.
    /// Workers are single-use: once started they can never be started again,
    /// even after they have stopped.
    AlreadyStarted {
        /// The name of the worker.
        name: String,
    },
    /// The OS refused to spawn the execution thread.
    Spawn {
        /// The name of the worker.
        name: String,
        /// The underlying I/O error from the thread spawn.
        source: io::Error,
    },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::AlreadyStarted { name } => {
                write!(f, "Worker '{name}' has already been started")
            }
            WorkerError::Spawn { name, source } => {
                write!(f, "Failed to spawn thread for worker '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::AlreadyStarted { .. } => None,
            WorkerError::Spawn { source, .. } => Some(source),
        }
    }
}
