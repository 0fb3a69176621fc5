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

//! # Cadence Core
//!
//! A tick-driven worker thread primitive: each [`Worker`] owns one OS thread
//! that runs user-supplied [`Lifecycle`] hooks at a target frequency, drains
//! a double-buffered task queue between ticks, and can block at startup until
//! other workers have entered their loops.
//!
//! Workers live in an explicit [`WorkerRegistry`], the only cross-worker
//! shared state. The registry is what lets a worker, upon entering its loop,
//! release every other worker that was waiting on it.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod registry;
pub mod worker;

pub use config::{QueueMode, WorkerConfig};
pub use error::WorkerError;
pub use hooks::{FnLifecycle, Lifecycle};
pub use queue::Task;
pub use registry::WorkerRegistry;
pub use worker::{Worker, WorkerHandle, WorkerId};
