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

//! Configuration for a [`Worker`](crate::Worker).

/// How a worker's task queue interacts with ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// The task queue is drained before each invocation of the tick hook.
    Enabled,
    /// Only the task queue is processed; the tick hook is never called.
    /// Draining is opportunistic: the loop sleeps while the queue is empty
    /// and bursts through it as soon as tasks arrive.
    Only,
    /// The task queue is not processed at all. Submitted tasks are dropped.
    Disabled,
}

/// Configuration for a [`Worker`](crate::Worker).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Diagnostic label. Also used to name the spawned OS thread.
    pub name: String,
    /// Target tick frequency in Hz. Any value `<= 0.0` means uncapped:
    /// the loop runs flat-out with no inter-tick sleep.
    pub ticks_per_second: f64,
    /// How the task queue interacts with ticking.
    pub queue_mode: QueueMode,
    /// Watermark for the task queue. If a drain finds more queued tasks than
    /// this, a warning is logged; every task is still executed.
    pub queue_warn_threshold: usize,
    /// If set, the worker removes itself from its registry once its loop has
    /// exited and its stop hook has returned, releasing the registry's
    /// ownership of it.
    pub self_destruct: bool,
}

impl WorkerConfig {
    /// Creates a configuration with the given name and default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            ticks_per_second: 50.0,
            queue_mode: QueueMode::Enabled,
            queue_warn_threshold: 250,
            self_destruct: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.ticks_per_second, 50.0);
        assert_eq!(config.queue_mode, QueueMode::Enabled);
        assert_eq!(config.queue_warn_threshold, 250);
        assert!(!config.self_destruct);
    }

    #[test]
    fn new_sets_name_and_keeps_defaults() {
        let config = WorkerConfig::new("render");
        assert_eq!(config.name, "render");
        assert_eq!(config.queue_mode, QueueMode::Enabled);
    }
}
