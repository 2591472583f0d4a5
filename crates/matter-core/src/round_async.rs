// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Asynchronous rounds: a fiber-per-particle pipeline with merged results.
//!
//! Every scheduled particle gets its own task running
//! wake -> LOOK -> COMPUTE -> stamp -> enqueue, with a uniformly random
//! delay in `[0, max_i]` between phases to model hardware with unknown
//! timing. A single controller task drains the result channel and applies
//! the resolver serially, in arrival order; the VOID-target check in the
//! resolver is what makes arrival order safe.
//!
//! The grid is behind one readers-writer lock: probes take it shared,
//! every mutation (wake, stamp, resolve, awoken bookkeeping) takes it
//! exclusive. Guards never live across an await.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::PhaseMaxima;
use crate::engine_impl::EngineError;
use crate::grid::{Coord, HexGrid};
use crate::policy::{
    ParticleInputs, PolicyBridge, PolicyError, RoundDiscipline, SchedulerInput,
};
use crate::resolver::{self, Resolution};
use crate::probe;
use crate::state::{Direction, ParticleState};

/// Grid plus the per-cell `awoken` matrix, shared under one lock.
///
/// `awoken` is the test-and-set guard that keeps at most one live worker
/// per cell; it is distinct from the particle's own AWAKE/SLEEP inner
/// state, which the worker flips later in its pipeline.
#[derive(Debug)]
pub(crate) struct SimState {
    /// The only shared mutable structure in the engine.
    pub grid: HexGrid,
    awoken: Vec<bool>,
    stopping: bool,
}

impl SimState {
    pub(crate) fn new(grid: HexGrid) -> Self {
        let cells = grid.len();
        Self {
            grid,
            awoken: vec![false; cells],
            stopping: false,
        }
    }

    /// Raised by the stop sweep; in-flight workers observe it and bail
    /// before touching the grid again.
    pub(crate) fn set_stopping(&mut self, stopping: bool) {
        self.stopping = stopping;
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Test-and-set of the per-cell worker guard. Returns `true` exactly
    /// when the caller should spawn a worker for `at`.
    pub(crate) fn try_begin(&mut self, at: Coord) -> bool {
        let Some(idx) = self.grid.index_of(at) else {
            return false;
        };
        if self.awoken[idx] {
            return false;
        }
        let live = self
            .grid
            .cell(at)
            .map(|p| p.state().is_live())
            .unwrap_or_default();
        if !live {
            return false;
        }
        self.awoken[idx] = true;
        true
    }

    pub(crate) fn is_awoken(&self, at: Coord) -> bool {
        self.grid
            .index_of(at)
            .map(|idx| self.awoken[idx])
            .unwrap_or_default()
    }

    pub(crate) fn clear_awoken(&mut self, at: Coord) {
        if let Some(idx) = self.grid.index_of(at) {
            self.awoken[idx] = false;
        }
    }

    /// Count of cells whose worker guard is currently set.
    pub(crate) fn awoken_count(&self) -> usize {
        self.awoken.iter().filter(|&&flag| flag).count()
    }

    /// Stop sweep: everything to SLEEP, all worker guards cleared.
    /// In-flight workers become stale and no-op at the controller.
    pub(crate) fn sweep_asleep(&mut self) {
        let coords: Vec<Coord> = self.grid.coords().collect();
        for at in coords {
            if let Some(cell) = self.grid.cell_mut(at) {
                cell.sleep();
            }
        }
        self.awoken.fill(false);
    }
}

/// One worker's terminal message to the controller.
#[derive(Debug)]
pub(crate) enum WorkerReport {
    /// The pipeline completed; the particle's `next_state` is stamped.
    Done(Coord),
    /// The particle policy failed; nothing was stamped.
    Failed {
        /// The worker's cell.
        at: Coord,
        /// The policy failure.
        error: PolicyError,
    },
}

/// What one async tick decided to do.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AsyncTickPlan {
    /// The scheduler chose a different discipline; nothing was spawned.
    Switch(RoundDiscipline),
    /// The shuffled work list to hand to the pipeline.
    Spawn(Vec<Coord>),
}

/// Composes the async work list for one tick.
///
/// The scheduler sees live, non-CONTRACTED particles. When event-driven is
/// set, CONTRACTED particles adjacent to anything other than empty space
/// or more resting matter (with `event_driven_with_blocks`: anything
/// non-VOID) are auto-added, with their cached degree reset to 0 so the
/// coming LOOK recomputes it.
pub(crate) fn plan_async_round<R: Rng>(
    state: &RwLock<SimState>,
    bridge: &PolicyBridge,
    rng: &mut R,
) -> Result<AsyncTickPlan, EngineError> {
    let (input, _) = {
        let s = state.read();
        SchedulerInput::collect_where(&s.grid, |p| p.state() != ParticleState::Contracted)
    };
    let decision = bridge.scheduler(&input)?;
    if decision.discipline != RoundDiscipline::Async {
        return Ok(AsyncTickPlan::Switch(decision.discipline));
    }

    let mut work = Vec::with_capacity(decision.active_particles.len());
    for name in &decision.active_particles {
        work.push(name.parse::<Coord>()?);
    }

    if decision.event_driven {
        let mut s = state.write();
        let contracted: Vec<Coord> = s
            .grid
            .live_coords()
            .filter(|&at| {
                s.grid
                    .cell(at)
                    .map(|p| p.state() == ParticleState::Contracted)
                    .unwrap_or_default()
            })
            .collect();
        for at in contracted {
            let eventful = Direction::ALL.into_iter().any(|dir| {
                let (r, c) = at.ring1(dir);
                let neighbor = s.grid.safe_state_at(r, c);
                if decision.event_driven_with_blocks {
                    neighbor != ParticleState::Void
                } else {
                    neighbor != ParticleState::Void && neighbor != ParticleState::Contracted
                }
            });
            if eventful {
                if let Some(cell) = s.grid.cell_mut(at) {
                    cell.stamp_degree(0);
                }
                work.push(at);
            }
        }
    }

    work.shuffle(rng);
    Ok(AsyncTickPlan::Spawn(work))
}

/// The per-engine async machinery: runtime, result channel, controller.
///
/// Created on the first async tick and joined on stop, so nothing outlives
/// the simulation that spawned it.
pub(crate) struct AsyncPipeline {
    runtime: tokio::runtime::Runtime,
    results_tx: mpsc::Sender<WorkerReport>,
    controller: JoinHandle<()>,
}

impl std::fmt::Debug for AsyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPipeline").finish_non_exhaustive()
    }
}

impl AsyncPipeline {
    /// Builds the runtime, the bounded result channel, and the controller.
    ///
    /// The channel holds one slot per grid cell, enough that no worker can
    /// ever block on send.
    ///
    /// # Errors
    /// Surfaces runtime construction failures as [`EngineError::Runtime`].
    pub(crate) fn new(
        state: Arc<RwLock<SimState>>,
        capacity: usize,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .thread_name("matter-async")
            .build()?;
        let (results_tx, results_rx) = mpsc::channel(capacity.max(1));
        let controller = runtime.spawn(controller_loop(state, results_rx));
        Ok(Self {
            runtime,
            results_tx,
            controller,
        })
    }

    /// Spawns one worker per not-yet-awoken cell on the work list.
    pub(crate) fn dispatch(
        &self,
        state: &Arc<RwLock<SimState>>,
        bridge: &PolicyBridge,
        delays: PhaseMaxima,
        work: Vec<Coord>,
    ) {
        let mut spawned = 0usize;
        let mut s = state.write();
        for at in work {
            if s.try_begin(at) {
                self.runtime.spawn(worker(
                    Arc::clone(state),
                    bridge.clone(),
                    delays,
                    at,
                    self.results_tx.clone(),
                ));
                spawned += 1;
            }
        }
        drop(s);
        debug!(spawned, "async tick dispatched");
    }

    /// Drops the dispatch side of the channel, waits for in-flight workers
    /// to drain through the controller, then tears the runtime down.
    pub(crate) fn shutdown(self) {
        let Self {
            runtime,
            results_tx,
            controller,
        } = self;
        drop(results_tx);
        if runtime.block_on(controller).is_err() {
            warn!("async controller terminated abnormally");
        }
    }
}

async fn phase_sleep(max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let ms = { rand::thread_rng().gen_range(0..=max_ms) };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// One particle's pipeline: wake, LOOK, COMPUTE, stamp, enqueue.
async fn worker(
    state: Arc<RwLock<SimState>>,
    bridge: PolicyBridge,
    delays: PhaseMaxima,
    at: Coord,
    results: mpsc::Sender<WorkerReport>,
) {
    phase_sleep(delays.wakeup_ms).await;
    {
        let mut s = state.write();
        if s.is_stopping() {
            return;
        }
        if let Some(cell) = s.grid.cell_mut(at) {
            cell.awake();
        }
    }

    // LOOK: observe shared, stamp exclusive.
    let obs = {
        let s = state.read();
        probe::observe(&s.grid, at)
    };
    {
        let mut s = state.write();
        probe::stamp(&mut s.grid, at, &obs);
    }
    phase_sleep(delays.look_ms).await;

    let inputs = {
        let s = state.read();
        let Some(cell) = s.grid.cell(at) else {
            return;
        };
        ParticleInputs::from_cell(cell)
    };
    let action = bridge.particle(&inputs);
    phase_sleep(delays.compute_ms).await;

    match action {
        Ok(next) => {
            {
                let mut s = state.write();
                if s.is_stopping() {
                    return;
                }
                if let Some(cell) = s.grid.cell_mut(at) {
                    cell.set_next_state(next);
                }
            }
            phase_sleep(delays.move_ms).await;
            if results.send(WorkerReport::Done(at)).await.is_err() {
                debug!(%at, "result channel closed before enqueue");
            }
        }
        Err(error) => {
            // Policy failures must not crash the process; report them on
            // the side channel and let the controller reschedule the cell.
            if results.send(WorkerReport::Failed { at, error }).await.is_err() {
                debug!(%at, "result channel closed before failure report");
            }
        }
    }
}

/// Applies completed pipelines serially, in arrival order.
async fn controller_loop(state: Arc<RwLock<SimState>>, mut rx: mpsc::Receiver<WorkerReport>) {
    while let Some(report) = rx.recv().await {
        match report {
            WorkerReport::Done(at) => {
                let mut s = state.write();
                let awake = s
                    .grid
                    .cell(at)
                    .map(crate::particle::Particle::is_awake)
                    .unwrap_or_default();
                if !awake {
                    // Stale result: a stop sweep already put the cell to
                    // sleep. Drop it on the floor.
                    s.clear_awoken(at);
                    continue;
                }
                match resolver::resolve(&mut s.grid, at) {
                    Resolution::Untouched => s.clear_awoken(at),
                    Resolution::Settled { at } => s.clear_awoken(at),
                    Resolution::Moved { from, to } => {
                        s.clear_awoken(from);
                        s.clear_awoken(to);
                    }
                }
            }
            WorkerReport::Failed { at, error } => {
                warn!(%at, %error, "async particle policy failed; cell rescheduled");
                let mut s = state.write();
                if let Some(cell) = s.grid.cell_mut(at) {
                    cell.sleep();
                    cell.set_next_state(ParticleState::Void);
                }
                s.clear_awoken(at);
            }
        }
    }
    debug!("async controller drained");
}
