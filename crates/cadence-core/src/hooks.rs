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

//! Lifecycle hooks injected into a [`Worker`](crate::Worker).
//!
//! The three hooks are the sole interface between the worker primitive and
//! whatever work actually happens on its thread: simulation, I/O, audio,
//! anything. All of them run on the worker's own thread, never concurrently
//! with each other.

/// The capability set a worker drives.
///
/// # Panics
///
/// The worker never catches a panic raised inside a hook. A panicking hook
/// unwinds the worker thread; the panic surfaces when the caller joins the
/// [`WorkerHandle`](crate::WorkerHandle). Recovery policy belongs to the
/// embedding application.
pub trait Lifecycle: Send + 'static {
    /// Called once on the worker thread, after the waiting-list barrier has
    /// cleared and before the first tick.
    fn on_start(&mut self) {}

    /// Called once per tick while the worker is running.
    ///
    /// `now_micros` is the tick timestamp in microseconds since the Unix
    /// epoch; `tick` is the tick index, starting at 0 and increasing by
    /// exactly one per invocation.
    ///
    /// Never called when the worker runs in [`QueueMode::Only`](crate::QueueMode::Only).
    fn on_tick(&mut self, now_micros: u64, tick: u64) {
        let _ = (now_micros, tick);
    }

    /// Called once on the worker thread after the loop has exited.
    fn on_stop(&mut self) {}
}

/// A [`Lifecycle`] built from three closures, for callers that do not want to
/// define a hook type of their own.
pub struct FnLifecycle {
    on_start: Box<dyn FnMut() + Send>,
    on_tick: Box<dyn FnMut(u64, u64) + Send>,
    on_stop: Box<dyn FnMut() + Send>,
}

impl FnLifecycle {
    /// Builds a lifecycle from start, tick, and stop closures.
    pub fn new(
        on_start: impl FnMut() + Send + 'static,
        on_tick: impl FnMut(u64, u64) + Send + 'static,
        on_stop: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            on_start: Box::new(on_start),
            on_tick: Box::new(on_tick),
            on_stop: Box::new(on_stop),
        }
    }

    /// Builds a lifecycle from a tick closure alone, with no-op start and
    /// stop hooks.
    pub fn ticker(on_tick: impl FnMut(u64, u64) + Send + 'static) -> Self {
        Self::new(|| {}, on_tick, || {})
    }
}

impl Lifecycle for FnLifecycle {
    fn on_start(&mut self) {
        (self.on_start)();
    }

    fn on_tick(&mut self, now_micros: u64, tick: u64) {
        (self.on_tick)(now_micros, tick);
    }

    fn on_stop(&mut self) {
        (self.on_stop)();
    }
}

impl std::fmt::Debug for FnLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLifecycle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn fn_lifecycle_dispatches_to_closures() {
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_probe = Arc::clone(&ticks);

        let mut hooks = FnLifecycle::ticker(move |_, tick| {
            ticks_probe.store(tick + 1, Ordering::SeqCst);
        });

        hooks.on_start();
        hooks.on_tick(0, 0);
        hooks.on_tick(0, 1);
        hooks.on_stop();

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn trait_defaults_are_no_ops() {
        struct Quiet;
        impl Lifecycle for Quiet {}

        let mut quiet = Quiet;
        quiet.on_start();
        quiet.on_tick(42, 0);
        quiet.on_stop();
    }
}
