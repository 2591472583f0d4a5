// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Synchronous rounds: a four-phase machine advanced one phase per tick.
//!
//! Phase order is strict and total: SCHEDULER -> LOOK -> COMPUTE -> MOVE.
//! The shuffled work list persists across phases of the same round, so the
//! order chosen at SCHEDULER is exactly the order COMPUTE and MOVE walk.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::engine_impl::EngineError;
use crate::grid::{Coord, HexGrid};
use crate::policy::{ParticleInputs, PolicyBridge, RoundDiscipline, SchedulerInput};
use crate::{probe, resolver};

/// The four phases of a synchronous round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Enumerate, consult the scheduler policy, shuffle, awaken.
    #[default]
    Scheduler,
    /// Bulk neighborhood refresh.
    Look,
    /// Run the particle policy for every awakened particle.
    Compute,
    /// Apply chosen actions and put the round's particles to sleep.
    Move,
}

/// What a single phase advance did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncStep {
    /// The named phase ran to completion.
    Ran(SyncPhase),
    /// The scheduler chose a different discipline; nothing was awakened
    /// and the phase did not advance.
    Switch(RoundDiscipline),
}

/// Synchronous round state machine.
#[derive(Debug, Default)]
pub(crate) struct SyncRound {
    phase: SyncPhase,
    work: Vec<Coord>,
}

impl SyncRound {
    /// Creates a machine parked at SCHEDULER with an empty work list.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The phase the next tick will run.
    pub(crate) fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Advances the round by one phase.
    ///
    /// # Errors
    /// Surfaces policy failures, malformed scheduler coordinates, and the
    /// duplicate-activation programmer error.
    pub(crate) fn advance<R: Rng>(
        &mut self,
        grid: &mut HexGrid,
        bridge: &PolicyBridge,
        rng: &mut R,
    ) -> Result<SyncStep, EngineError> {
        match self.phase {
            SyncPhase::Scheduler => self.run_scheduler(grid, bridge, rng),
            SyncPhase::Look => {
                probe::refresh_all(grid);
                self.phase = SyncPhase::Compute;
                Ok(SyncStep::Ran(SyncPhase::Look))
            }
            SyncPhase::Compute => self.run_compute(grid, bridge),
            SyncPhase::Move => {
                for &at in &self.work {
                    resolver::resolve(grid, at);
                }
                debug!(particles = self.work.len(), "round complete");
                self.work.clear();
                self.phase = SyncPhase::Scheduler;
                Ok(SyncStep::Ran(SyncPhase::Move))
            }
        }
    }

    fn run_scheduler<R: Rng>(
        &mut self,
        grid: &mut HexGrid,
        bridge: &PolicyBridge,
        rng: &mut R,
    ) -> Result<SyncStep, EngineError> {
        let (input, _) = SchedulerInput::collect(grid);
        let decision = bridge.scheduler(&input)?;
        if decision.discipline != RoundDiscipline::Sync {
            return Ok(SyncStep::Switch(decision.discipline));
        }

        let mut work = Vec::with_capacity(decision.active_particles.len());
        for name in &decision.active_particles {
            work.push(name.parse::<Coord>()?);
        }
        work.shuffle(rng);

        let mut awakened = Vec::with_capacity(work.len());
        for &at in &work {
            let cell = grid.try_cell_mut(at)?;
            if !cell.state().is_live() {
                // VOID cells are never awakened; a scheduler naming one is
                // dropped from the round rather than violating the invariant.
                warn!(%at, "scheduler activated a non-live cell");
                continue;
            }
            if !cell.awake() {
                return Err(EngineError::SchedulerDuplicate(at));
            }
            awakened.push(at);
        }
        debug!(active = awakened.len(), "scheduler phase done");
        self.work = awakened;
        self.phase = SyncPhase::Look;
        Ok(SyncStep::Ran(SyncPhase::Scheduler))
    }

    fn run_compute(
        &mut self,
        grid: &mut HexGrid,
        bridge: &PolicyBridge,
    ) -> Result<SyncStep, EngineError> {
        for &at in &self.work {
            let Some(cell) = grid.cell(at) else {
                continue;
            };
            if !cell.is_awake() {
                continue;
            }
            let inputs = ParticleInputs::from_cell(cell);
            let action = bridge.particle(&inputs)?;
            if let Some(cell) = grid.cell_mut(at) {
                cell.set_next_state(action);
            }
        }
        self.phase = SyncPhase::Move;
        Ok(SyncStep::Ran(SyncPhase::Compute))
    }
}
