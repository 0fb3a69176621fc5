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

//! Demo wiring for the worker primitive: a 60 Hz simulation worker, a
//! queue-only I/O worker the simulation waits on, cross-thread task
//! submission, a mid-run rate change, and a coordinated shutdown.

use anyhow::Result;
use cadence_core::{FnLifecycle, QueueMode, Worker, WorkerConfig, WorkerRegistry};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let registry = WorkerRegistry::new();

    let io_config = WorkerConfig {
        queue_mode: QueueMode::Only,
        ticks_per_second: 100.0,
        self_destruct: true,
        ..WorkerConfig::new("io")
    };
    let io = Worker::new(
        io_config,
        FnLifecycle::new(|| log::info!("io worker up"), |_, _| {}, || {}),
        &registry,
    );

    let sim_config = WorkerConfig {
        ticks_per_second: 60.0,
        self_destruct: true,
        ..WorkerConfig::new("simulation")
    };
    let io_for_sim = Arc::clone(&io);
    let sim = Worker::new(
        sim_config,
        FnLifecycle::new(
            || log::info!("simulation up"),
            move |_now, tick| {
                // Hand a chunk of off-band work to the I/O worker each second.
                if tick % 60 == 0 {
                    let generation = tick / 60;
                    io_for_sim.submit(move || {
                        log::info!("io worker flushing generation {generation}");
                    });
                }
            },
            || log::info!("simulation down"),
        ),
        &registry,
    );

    // The simulation refuses to tick before the I/O worker is live.
    let sim_handle = sim.start(&[Arc::clone(&io)])?;
    let io_handle = io.start(&[])?;

    thread::sleep(Duration::from_secs(2));
    log::info!(
        "simulation at {} ticks, retargeting to 120 tps",
        sim.tick_count()
    );
    sim.set_ticks_per_second(120.0);

    thread::sleep(Duration::from_secs(2));

    sim.stop();
    io.stop();
    sim_handle
        .join()
        .map_err(|_| anyhow::anyhow!("simulation worker panicked"))?;
    io_handle
        .join()
        .map_err(|_| anyhow::anyhow!("io worker panicked"))?;

    log::info!(
        "all workers drained; registry holds {} entries",
        registry.len()
    );
    Ok(())
}
