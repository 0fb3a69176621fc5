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

//! The tick-driven worker thread primitive.
//!
//! A [`Worker`] owns one OS thread that runs the injected
//! [`Lifecycle`] hooks: `on_start` once the waiting-list barrier clears,
//! `on_tick` at the target frequency until stopped, `on_stop` on the way out.
//! The loop compensates for scheduling drift with a signed overhead
//! accumulator clamped to ±2 ms, trading perfect average rate for a bounded
//! worst-case catch-up burst.

use crate::config::{QueueMode, WorkerConfig};
use crate::error::WorkerError;
use crate::hooks::Lifecycle;
use crate::queue::{Task, TaskQueue};
use crate::registry::WorkerRegistry;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Bound on the drift accumulator. Without it a single long stall would make
/// the loop sleep zero for as many ticks as it takes to catch up, starving
/// queued tasks.
const MAX_OVERHEAD_MICROS: i64 = 2000;

/// Process-unique identity of a worker, used by waiting lists and the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pacing state derived from the target tick frequency. `tps` is `-1.0` and
/// `interval` zero in uncapped mode.
#[derive(Debug, Clone, Copy)]
struct Pace {
    tps: f64,
    interval: Duration,
    uncapped: bool,
}

impl Pace {
    fn from_tps(tps: f64) -> Self {
        if tps <= 0.0 {
            Self {
                tps: -1.0,
                interval: Duration::ZERO,
                uncapped: true,
            }
        } else {
            Self {
                tps,
                interval: Duration::from_micros((1_000_000.0 / tps) as u64),
                uncapped: false,
            }
        }
    }
}

/// A tick-driven worker thread.
///
/// Constructed via [`Worker::new`], which registers the worker in its
/// [`WorkerRegistry`] and returns it as an `Arc`. The worker is inert until
/// [`start`](Worker::start) spawns its execution thread; it is single-use and
/// can never be started a second time.
pub struct Worker {
    name: String,
    id: WorkerId,
    registry: Weak<WorkerRegistry>,
    queue_mode: QueueMode,
    self_destruct: bool,
    queue: TaskQueue,
    pace: Mutex<Pace>,
    /// Ids of the workers this one blocks on before entering its loop.
    /// Only ever shrinks once the barrier wait has begun.
    waiting: Mutex<HashSet<WorkerId>>,
    waiting_cleared: Condvar,
    /// Taken by the spawned thread on its way into `thread_main`.
    hooks: Mutex<Option<Box<dyn Lifecycle>>>,
    /// Set by the first successful `start` and never cleared afterwards;
    /// this is what makes workers single-use.
    launched: AtomicBool,
    started: AtomicBool,
    running: AtomicBool,
    stopping: AtomicBool,
    tick_count: AtomicU64,
    last_tick_micros: AtomicU64,
}

impl Worker {
    /// Constructs a worker and registers it in `registry`.
    ///
    /// The worker holds only a weak reference back to the registry, so
    /// dropping the registry (and every outstanding worker `Arc`) reclaims
    /// everything even though the registry owns its workers.
    pub fn new(
        config: WorkerConfig,
        hooks: impl Lifecycle,
        registry: &Arc<WorkerRegistry>,
    ) -> Arc<Self> {
        let worker = Arc::new(Self {
            id: WorkerId::next(),
            registry: Arc::downgrade(registry),
            queue_mode: config.queue_mode,
            self_destruct: config.self_destruct,
            queue: TaskQueue::new(config.queue_warn_threshold),
            pace: Mutex::new(Pace::from_tps(config.ticks_per_second)),
            waiting: Mutex::new(HashSet::new()),
            waiting_cleared: Condvar::new(),
            hooks: Mutex::new(Some(Box::new(hooks))),
            launched: AtomicBool::new(false),
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            tick_count: AtomicU64::new(0),
            last_tick_micros: AtomicU64::new(0),
            name: config.name,
        });
        registry.register(Arc::clone(&worker));
        log::info!("worker '{}' {} created", worker.name, worker.id);
        worker
    }

    /// Spawns the execution thread and returns a handle to it.
    ///
    /// Non-blocking: all waiting happens on the spawned thread, which blocks
    /// until every worker in `wait_for` has entered its loop, then runs
    /// `on_start`, announces itself through the registry, and begins ticking.
    /// Workers in `wait_for` that are already running cause no delay.
    ///
    /// Two workers starting while mutually waiting on each other deadlock
    /// permanently; the core does not detect cycles.
    ///
    /// # Errors
    ///
    /// [`WorkerError::AlreadyStarted`] if this worker has ever been started
    /// before (stopped workers are not restartable), or
    /// [`WorkerError::Spawn`] if the OS thread could not be created. A
    /// failed spawn is fully rolled back: the worker still reads as never
    /// started and a later `start` may retry.
    pub fn start(
        self: &Arc<Self>,
        wait_for: &[Arc<Worker>],
    ) -> Result<WorkerHandle, WorkerError> {
        if self.launched.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyStarted {
                name: self.name.clone(),
            });
        }

        self.started.store(true, Ordering::SeqCst);
        self.stopping.store(false, Ordering::SeqCst);

        {
            let mut waiting = self.waiting.lock().unwrap();
            for other in wait_for {
                // A worker flips `running` before its announce scan, so any
                // dependency that passes this check is guaranteed to still
                // visit our waiting list when it does come up.
                if other.id != self.id && !other.is_running() {
                    waiting.insert(other.id);
                }
            }
        }

        let worker = Arc::clone(self);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                // The launch guard means nobody else can have taken these.
                let hooks = worker.hooks.lock().unwrap().take();
                if let Some(mut hooks) = hooks {
                    worker.thread_main(hooks.as_mut());
                }
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(join) => Ok(WorkerHandle {
                join,
                done: done_rx,
            }),
            Err(source) => {
                // No thread exists; roll everything back so the worker
                // reads as freshly created rather than wedged mid-start.
                self.waiting.lock().unwrap().clear();
                self.started.store(false, Ordering::SeqCst);
                self.launched.store(false, Ordering::SeqCst);
                Err(WorkerError::Spawn {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Submits a task for execution on this worker's thread.
    ///
    /// Best-effort and fire-and-forget: the task is silently dropped unless
    /// the worker is currently running and its queue mode is not
    /// [`QueueMode::Disabled`]. Callers that need drop detection must check
    /// [`is_running`](Worker::is_running) themselves.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        if self.queue_mode == QueueMode::Disabled || !self.is_running() {
            return;
        }
        self.queue.push(Box::new(task) as Task);
    }

    /// Requests the loop to exit. Cooperative and non-blocking: an in-flight
    /// tick, sleep, or queue drain runs to completion before the loop
    /// condition is re-checked. Idempotent; a no-op on a worker that is not
    /// started.
    pub fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        self.stopping.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        log::info!("worker '{}' stop requested", self.name);
    }

    /// The diagnostic label this worker was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This worker's process-unique id.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// `true` from `start` until the stop hook has returned.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// `true` while the loop is live. Implies [`has_started`](Worker::has_started).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `true` between a [`stop`](Worker::stop) request and the stop hook
    /// returning.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// The target tick frequency, or `-1.0` in uncapped mode.
    pub fn ticks_per_second(&self) -> f64 {
        self.pace.lock().unwrap().tps
    }

    /// Retargets the tick frequency. Callable from any thread at any time;
    /// the loop picks the new pace up on its next iteration. Values `<= 0.0`
    /// switch the worker to uncapped mode.
    pub fn set_ticks_per_second(&self, tps: f64) {
        *self.pace.lock().unwrap() = Pace::from_tps(tps);
        log::debug!("worker '{}' retargeted to {} tps", self.name, tps);
    }

    /// Number of tick-hook invocations so far. Never decreases.
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::SeqCst)
    }

    /// Timestamp of the most recent tick, in microseconds since the Unix
    /// epoch. Zero before the first tick.
    pub fn last_tick_micros(&self) -> u64 {
        self.last_tick_micros.load(Ordering::SeqCst)
    }

    /// Removes `id` from this worker's waiting list, waking the barrier wait
    /// if the list just emptied.
    pub(crate) fn clear_waiting(&self, id: WorkerId) {
        let mut waiting = self.waiting.lock().unwrap();
        if waiting.remove(&id) && waiting.is_empty() {
            self.waiting_cleared.notify_all();
        }
    }

    /// Entry point of the spawned thread.
    fn thread_main(&self, hooks: &mut dyn Lifecycle) {
        self.wait_for_dependencies();

        log::info!("worker '{}' starting", self.name);
        hooks.on_start();

        // Order matters: `running` must be observable before the announce
        // scan so dependents cannot miss both (see `start`). A stop request
        // that arrived while we were still waiting wins; the announce still
        // happens so dependents are released either way.
        if !self.stopping.load(Ordering::SeqCst) {
            self.running.store(true, Ordering::SeqCst);
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.announce_started(self.id);
        }

        self.run(hooks);

        hooks.on_stop();
        self.started.store(false, Ordering::SeqCst);
        self.stopping.store(false, Ordering::SeqCst);
        log::info!("worker '{}' stopped after {} ticks", self.name, self.tick_count());

        if self.self_destruct {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(self.id);
            }
        }
    }

    /// Blocks until every worker this one waits on has announced itself.
    fn wait_for_dependencies(&self) {
        let mut waiting = self.waiting.lock().unwrap();
        while !waiting.is_empty() {
            log::debug!(
                "worker '{}' waiting on {} other worker(s)",
                self.name,
                waiting.len()
            );
            waiting = self.waiting_cleared.wait(waiting).unwrap();
        }
    }

    /// The loop itself. Runs until `stop` clears the running flag.
    fn run(&self, hooks: &mut dyn Lifecycle) {
        if self.queue_mode == QueueMode::Only {
            self.run_queue_only();
        } else {
            self.run_ticking(hooks);
        }
    }

    /// Queue-only shape: no ticking, no fixed rate. Sleeps one interval when
    /// the back buffer is empty, otherwise bursts through the whole queue.
    fn run_queue_only(&self) {
        while self.running.load(Ordering::SeqCst) {
            if self.queue.is_back_empty() {
                // Copy the interval out; the pace lock must not be held
                // across the sleep or rate changes stall behind it.
                let interval = self.pace.lock().unwrap().interval;
                thread::sleep(interval);
            } else {
                self.queue.drain(&self.name);
            }
        }
    }

    /// Ticking shape, both uncapped and rate-limited variants.
    fn run_ticking(&self, hooks: &mut dyn Lifecycle) {
        // Seed the previous-tick mark one interval back so the first
        // iteration measures a neutral duration and accrues no overhead.
        let initial_interval = self.pace.lock().unwrap().interval;
        let mut last_tick = Instant::now()
            .checked_sub(initial_interval)
            .unwrap_or_else(Instant::now);
        let mut overhead: i64 = 0;

        while self.running.load(Ordering::SeqCst) {
            let pace = *self.pace.lock().unwrap();
            let now = Instant::now();
            let duration = now.duration_since(last_tick);
            last_tick = now;

            if pace.uncapped {
                self.tick(hooks);
            } else {
                overhead += duration.as_micros() as i64 - pace.interval.as_micros() as i64;
                overhead = overhead.clamp(-MAX_OVERHEAD_MICROS, MAX_OVERHEAD_MICROS);

                // Absolute deadline: sleeping until `now + interval - overhead`
                // rather than for a relative amount keeps scheduler latency
                // from compounding tick over tick.
                let deadline = if overhead >= 0 {
                    (now + pace.interval)
                        .checked_sub(Duration::from_micros(overhead as u64))
                        .unwrap_or(now)
                } else {
                    now + pace.interval + Duration::from_micros((-overhead) as u64)
                };

                self.tick(hooks);

                let remaining = deadline.saturating_duration_since(Instant::now());
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
        }
    }

    /// One tick: drain the queue first so queued mutations are visible to
    /// the tick logic of the same period, then fire the hook.
    fn tick(&self, hooks: &mut dyn Lifecycle) {
        if self.queue_mode == QueueMode::Enabled {
            self.queue.drain(&self.name);
        }

        let stamp = epoch_micros();
        self.last_tick_micros.store(stamp, Ordering::SeqCst);
        let tick = self.tick_count.fetch_add(1, Ordering::SeqCst);
        hooks.on_tick(stamp, tick);
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("queue_mode", &self.queue_mode)
            .field("started", &self.has_started())
            .field("running", &self.is_running())
            .field("stopping", &self.is_stopping())
            .field("tick_count", &self.tick_count())
            .finish_non_exhaustive()
    }
}

/// Join token for a worker's execution thread, returned by
/// [`Worker::start`].
#[derive(Debug)]
pub struct WorkerHandle {
    join: thread::JoinHandle<()>,
    done: crossbeam_channel::Receiver<()>,
}

impl WorkerHandle {
    /// Blocks until the worker thread has exited, surfacing a hook or task
    /// panic as `Err`.
    pub fn join(self) -> thread::Result<()> {
        self.join.join()
    }

    /// Waits up to `timeout` for the worker's completion signal, sent after
    /// its stop hook has returned. Returns `true` if the worker finished in
    /// time. The signal fires once; after it has been consumed, further
    /// calls time out.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.done.recv_timeout(timeout).is_ok()
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

fn epoch_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
