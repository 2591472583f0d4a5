// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The simulation engine: grid ownership, lifecycle, and the tick loop.
//!
//! A driver calls [`Engine::tick`] at its own cadence. Each tick either
//! advances the current synchronous round by one phase or, under the
//! asynchronous discipline, launches per-particle worker tasks whose
//! results a controller task merges back into the grid. Both paths
//! converge on the move resolver.

use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BootstrapConfig, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
use crate::grid::{Coord, GridError, GridGeometry, HexGrid};
use crate::particle::ParticleError;
use crate::policy::{Policy, PolicyBridge, PolicyError, RoundDiscipline};
use crate::round_async::{plan_async_round, AsyncPipeline, AsyncTickPlan, SimState};
use crate::round_sync::{SyncPhase, SyncRound, SyncStep};
use crate::telemetry::{NullProgressSink, ProgressSink};

/// Errors emitted by the engine.
///
/// Everything here surfaces synchronously from [`Engine::tick`]; a failed
/// tick also transitions the engine to stopped so a driver can notice and
/// tear down cleanly instead of ticking a corrupt round.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A policy failed, or returned something outside its contract.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// A coordinate failed to address the grid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A particle mutation was rejected.
    #[error(transparent)]
    Particle(#[from] ParticleError),
    /// The scheduler activated the same particle twice in one round.
    #[error("scheduler returned duplicate particle {0}")]
    SchedulerDuplicate(Coord),
    /// The async runtime could not be constructed.
    #[error("async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Fluent builder for [`Engine`] instances.
///
/// # Example
///
/// ```rust
/// use matter_core::{BootstrapConfig, EngineBuilder, TablePolicy};
///
/// let config = BootstrapConfig::new().with_cell("1,1", 1);
/// let engine = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
///     .grid(3, 5)
///     .bootstrap(config)
///     .build();
/// assert!(engine.is_ok());
/// ```
pub struct EngineBuilder {
    policy: Box<dyn Policy>,
    shape: Option<GridGeometry>,
    viewport: (u32, u32),
    config: BootstrapConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("shape", &self.shape)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl EngineBuilder {
    /// Creates a builder around the supplied policy object.
    ///
    /// Defaults:
    /// - Grid shape: derived from an 800x600 viewport and the bootstrap
    ///   hex size.
    /// - Bootstrap: empty (`BootstrapConfig::new`).
    /// - Progress sink: [`NullProgressSink`].
    pub fn new(policy: Box<dyn Policy>) -> Self {
        Self {
            policy,
            shape: None,
            viewport: (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
            config: BootstrapConfig::new(),
            progress: None,
        }
    }

    /// Sets an explicit grid shape, overriding viewport derivation.
    #[must_use]
    pub fn grid(mut self, rows: usize, cols: usize) -> Self {
        self.shape = Some(GridGeometry { rows, cols });
        self
    }

    /// Sets the viewport the grid shape is derived from.
    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Sets the bootstrap document (hex size, seed cells, phase maxima).
    #[must_use]
    pub fn bootstrap(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the progress sink the engine reports rounds to.
    #[must_use]
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Builds the engine and seeds the grid from `init_state`.
    ///
    /// # Errors
    /// Returns [`EngineError::Grid`] for malformed or out-of-bounds seed
    /// keys and [`EngineError::Particle`] for seed values outside 0..=14.
    pub fn build(self) -> Result<Engine, EngineError> {
        let shape = self.shape.unwrap_or_else(|| {
            GridGeometry::from_viewport(self.viewport.0, self.viewport.1, self.config.hex_size)
        });
        let mut grid = HexGrid::new(shape.rows, shape.cols);
        for (key, &number) in &self.config.init_state {
            let at: Coord = key.parse()?;
            grid.try_cell_mut(at)?.set_state_by_number(number)?;
        }
        info!(
            rows = shape.rows,
            cols = shape.cols,
            seeded = self.config.init_state.len(),
            "engine built"
        );
        Ok(Engine {
            state: Arc::new(RwLock::new(SimState::new(grid))),
            bridge: PolicyBridge::new(self.policy),
            config: self.config,
            discipline: RoundDiscipline::Sync,
            sync_round: SyncRound::new(),
            pipeline: None,
            progress: self.progress.unwrap_or_else(|| Arc::new(NullProgressSink)),
            rng: StdRng::from_entropy(),
            running: false,
        })
    }
}

/// The simulation engine.
pub struct Engine {
    state: Arc<RwLock<SimState>>,
    bridge: PolicyBridge,
    config: BootstrapConfig,
    discipline: RoundDiscipline,
    sync_round: SyncRound,
    pipeline: Option<AsyncPipeline>,
    progress: Arc<dyn ProgressSink>,
    rng: StdRng,
    running: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("discipline", &self.discipline)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Shorthand for [`EngineBuilder::new`].
    pub fn builder(policy: Box<dyn Policy>) -> EngineBuilder {
        EngineBuilder::new(policy)
    }

    /// True between [`Engine::start`] and [`Engine::stop`].
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts accepting ticks.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.state.write().set_stopping(false);
        self.running = true;
        info!("simulation start");
    }

    /// Stops the simulation: sweeps every particle to SLEEP, lets
    /// in-flight async workers drain as no-ops, and joins the controller.
    pub fn stop(&mut self) {
        if !self.running && self.pipeline.is_none() {
            return;
        }
        self.running = false;
        self.halt();
        info!("simulation stop");
    }

    fn halt(&mut self) {
        {
            let mut s = self.state.write();
            s.set_stopping(true);
            s.sweep_asleep();
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        // A straggler may have re-awoken its cell between the sweep and
        // its own stopping check; the second sweep is cheap and final.
        self.state.write().sweep_asleep();
    }

    /// Advances the simulation by one tick and reports the round counter.
    ///
    /// When stopped this only reports progress. A failing tick stops the
    /// engine before the error is returned.
    ///
    /// # Errors
    /// See [`EngineError`]; all tick-time failures surface here.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        if self.running {
            if let Err(err) = self.advance() {
                warn!(%err, "tick failed; stopping simulation");
                self.running = false;
                self.halt();
                return Err(err);
            }
        }
        self.progress.on_round(self.current_round());
        Ok(())
    }

    fn advance(&mut self) -> Result<(), EngineError> {
        match self.discipline {
            RoundDiscipline::Sync => {
                let step = {
                    let mut s = self.state.write();
                    self.sync_round
                        .advance(&mut s.grid, &self.bridge, &mut self.rng)?
                };
                if let SyncStep::Switch(discipline) = step {
                    info!(?discipline, "scheduler switched discipline");
                    self.discipline = discipline;
                }
            }
            RoundDiscipline::Async => {
                match plan_async_round(&self.state, &self.bridge, &mut self.rng)? {
                    AsyncTickPlan::Switch(discipline) => {
                        info!(?discipline, "scheduler switched discipline");
                        self.discipline = discipline;
                    }
                    AsyncTickPlan::Spawn(work) => {
                        if self.pipeline.is_none() {
                            let capacity = self.state.read().grid.len();
                            self.pipeline =
                                Some(AsyncPipeline::new(Arc::clone(&self.state), capacity)?);
                        }
                        if let Some(pipeline) = &self.pipeline {
                            pipeline.dispatch(
                                &self.state,
                                &self.bridge,
                                self.config.phase_maxima,
                                work,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The round counter: minimum round over live particles, 0 when the
    /// grid holds none.
    pub fn current_round(&self) -> u64 {
        let s = self.state.read();
        s.grid
            .live_coords()
            .filter_map(|at| s.grid.cell(at).map(crate::particle::Particle::round))
            .min()
            .unwrap_or(0)
    }

    /// The discipline the next tick will run under.
    pub fn discipline(&self) -> RoundDiscipline {
        self.discipline
    }

    /// The synchronous phase the next tick will run.
    pub fn sync_phase(&self) -> SyncPhase {
        self.sync_round.phase()
    }

    /// Number of live particles.
    pub fn live_count(&self) -> usize {
        self.state.read().grid.live_count()
    }

    /// Number of cells with an in-flight async worker. Drivers and tests
    /// poll this to observe async round completion.
    pub fn busy_cells(&self) -> usize {
        self.state.read().awoken_count()
    }

    /// A point-in-time copy of the grid.
    pub fn snapshot(&self) -> HexGrid {
        self.state.read().grid.clone()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.pipeline.is_some() {
            self.halt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::TablePolicy;
    use crate::state::ParticleState;

    fn sync_engine(config: BootstrapConfig) -> Engine {
        let Ok(engine) = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
            .grid(3, 5)
            .bootstrap(config)
            .build()
        else {
            unreachable!("fixture engine must build");
        };
        engine
    }

    #[test]
    fn build_seeds_cells_from_init_state() {
        let engine = sync_engine(
            BootstrapConfig::new()
                .with_cell("1,1", 1)
                .with_cell("1,3", 14),
        );
        let grid = engine.snapshot();
        assert_eq!(grid.safe_state_at(1, 1), ParticleState::Contracted);
        assert_eq!(grid.safe_state_at(1, 3), ParticleState::Obstacle);
        assert_eq!(engine.live_count(), 1, "obstacles are not live");
    }

    #[test]
    fn build_rejects_malformed_seed_keys() {
        let result = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
            .grid(3, 5)
            .bootstrap(BootstrapConfig::new().with_cell("one,one", 1))
            .build();
        assert!(matches!(result, Err(EngineError::Grid(_))));
    }

    #[test]
    fn build_rejects_out_of_bounds_and_bad_values() {
        let result = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
            .grid(3, 5)
            .bootstrap(BootstrapConfig::new().with_cell("7,7", 1))
            .build();
        assert!(matches!(result, Err(EngineError::Grid(_))));

        let result = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
            .grid(3, 5)
            .bootstrap(BootstrapConfig::new().with_cell("1,1", 99))
            .build();
        assert!(matches!(result, Err(EngineError::Particle(_))));
    }

    #[test]
    fn build_derives_shape_from_viewport_when_unset() {
        let Ok(engine) = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
            .viewport(800, 600)
            .build()
        else {
            unreachable!("fixture engine must build");
        };
        let grid = engine.snapshot();
        assert_eq!((grid.rows(), grid.cols()), (44, 51));
    }

    #[test]
    fn ticks_are_inert_until_start() {
        let mut engine = sync_engine(BootstrapConfig::new().with_cell("1,1", 1));
        let Ok(()) = engine.tick() else {
            unreachable!("inert tick must succeed");
        };
        assert_eq!(engine.current_round(), 0);
        assert!(!engine.is_running());
    }

    #[test]
    fn round_counter_tracks_full_sync_rounds() {
        let mut engine = sync_engine(
            BootstrapConfig::new()
                .with_cell("1,1", 1)
                .with_cell("1,3", 1),
        );
        engine.start();
        // One sync round is four ticks (one phase per tick).
        for expected_round in 1..=3u64 {
            for _ in 0..4 {
                let Ok(()) = engine.tick() else {
                    unreachable!("tick must succeed");
                };
            }
            assert_eq!(engine.current_round(), expected_round);
        }
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn failing_policy_stops_the_engine() {
        struct Broken;
        impl Policy for Broken {
            fn scheduler(
                &mut self,
                _input: &crate::policy::SchedulerInput,
            ) -> Result<crate::policy::SchedulerDecision, PolicyError> {
                Err(PolicyError::Evaluation("scripted failure".to_owned()))
            }
            fn particle(
                &mut self,
                _input: &crate::policy::ParticleInputs,
            ) -> Result<String, PolicyError> {
                Ok("CONTRACTED".to_owned())
            }
        }

        let Ok(mut engine) = EngineBuilder::new(Box::new(Broken))
            .grid(3, 5)
            .bootstrap(BootstrapConfig::new().with_cell("1,1", 1))
            .build()
        else {
            unreachable!("fixture engine must build");
        };
        engine.start();
        assert!(engine.tick().is_err());
        assert!(!engine.is_running(), "policy failure must stop the engine");
        let Ok(()) = engine.tick() else {
            unreachable!("post-failure ticks are inert");
        };
    }
}
