// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The policy seam: scheduler and particle transition policies, and the
//! bridge that marshals engine state across the stringly-typed boundary.
//!
//! Policies are untyped from the engine's point of view: the engine hands
//! over name strings and reads back name strings, so any evaluator (a
//! built-in rule table, an embedded scripting language, a test stub) can
//! sit behind [`Policy`] without the engine depending on its execution
//! model.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::grid::{Coord, GridError, HexGrid};
use crate::particle::Particle;
use crate::state::ParticleState;

/// Errors surfaced from policy evaluation and the marshaling boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy itself failed to evaluate.
    #[error("policy evaluation failed: {0}")]
    Evaluation(String),
    /// The policy returned a name outside the action set. OBSTACLE is a
    /// known tag but never a legal action, so it lands here too.
    #[error("'{0}' is not a recognized action name")]
    UnknownAction(String),
    /// The scheduler returned a coordinate string that does not parse or
    /// does not address the grid.
    #[error(transparent)]
    Coordinate(#[from] GridError),
    /// A discipline string that is neither "sync" nor "async".
    #[error("'{0}' is not a scheduler type (expected \"sync\" or \"async\")")]
    UnknownDiscipline(String),
    /// Cyclic selection against an empty shelf.
    #[error("no particle policies registered")]
    EmptyShelf,
    /// Cyclic selection index outside `0..=len`.
    #[error("policy index {index} out of range 0..={len}")]
    ShelfIndex {
        /// Requested index.
        index: usize,
        /// Number of registered policies.
        len: usize,
    },
}

/// Which round machinery drives the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundDiscipline {
    /// Four-phase deterministic rounds, one phase per tick.
    #[default]
    Sync,
    /// Fiber-per-particle rounds with randomized phase delays.
    Async,
}

impl RoundDiscipline {
    /// Parses the boundary encoding, case-insensitively.
    ///
    /// # Errors
    /// Returns [`PolicyError::UnknownDiscipline`] for anything that is not
    /// "sync" or "async".
    pub fn from_name(s: &str) -> Result<Self, PolicyError> {
        if s.eq_ignore_ascii_case("sync") {
            Ok(Self::Sync)
        } else if s.eq_ignore_ascii_case("async") {
            Ok(Self::Async)
        } else {
            Err(PolicyError::UnknownDiscipline(s.to_owned()))
        }
    }
}

/// Scheduler-policy input: two parallel sequences over live particles in
/// row-major order.
#[derive(Debug, Clone, Default)]
pub struct SchedulerInput {
    /// Coordinate strings `"row,col"`.
    pub particles: Vec<String>,
    /// State names parallel to `particles`.
    pub states: Vec<&'static str>,
}

impl SchedulerInput {
    /// Collects every live particle.
    ///
    /// Returns the marshaled input together with the parsed coordinates in
    /// the same order, so callers never re-parse their own strings.
    pub fn collect(grid: &HexGrid) -> (Self, Vec<Coord>) {
        Self::collect_where(grid, |_| true)
    }

    /// Collects live particles matching `pred`.
    pub fn collect_where(
        grid: &HexGrid,
        pred: impl Fn(&Particle) -> bool,
    ) -> (Self, Vec<Coord>) {
        let mut input = Self::default();
        let mut coords = Vec::new();
        for at in grid.live_coords() {
            let Some(cell) = grid.cell(at) else {
                continue;
            };
            if pred(cell) {
                input.particles.push(at.to_string());
                input.states.push(cell.state().name());
                coords.push(at);
            }
        }
        (input, coords)
    }
}

/// Scheduler-policy output.
#[derive(Debug, Clone, Default)]
pub struct SchedulerDecision {
    /// Coordinate strings of the particles to awaken this round.
    pub active_particles: Vec<String>,
    /// Which round machinery runs subsequent ticks.
    pub discipline: RoundDiscipline,
    /// Auto-schedule CONTRACTED particles that have at least one eventful
    /// neighbor: anything other than empty space or more resting matter.
    pub event_driven: bool,
    /// Event-driven variant under which resting (CONTRACTED) neighbors
    /// count as eventful too.
    pub event_driven_with_blocks: bool,
}

/// Particle-policy input, bound by name exactly as the boundary contract
/// names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // Field names *are* the contract; prose adds nothing.
pub struct ParticleInputs {
    /// Own state name.
    pub state: &'static str,
    // First-ring state names.
    pub l: &'static str,
    pub r: &'static str,
    pub ul: &'static str,
    pub ur: &'static str,
    pub ll: &'static str,
    pub lr: &'static str,
    // Second-ring state names.
    pub l2: &'static str,
    pub r2: &'static str,
    pub u2l: &'static str,
    pub u2r: &'static str,
    pub l2l: &'static str,
    pub l2r: &'static str,
    // First-ring degrees.
    pub dl: u8,
    pub dr: u8,
    pub dul: u8,
    pub dur: u8,
    pub dll: u8,
    pub dlr: u8,
}

impl ParticleInputs {
    /// Marshals a particle's cached neighborhood into named inputs.
    pub fn from_cell(p: &Particle) -> Self {
        let (n1, n2) = p.neighbors_as_names();
        let deg = p.neighbor1_deg();
        Self {
            state: p.state().name(),
            l: n1[0],
            r: n1[1],
            ul: n1[2],
            ur: n1[3],
            ll: n1[4],
            lr: n1[5],
            l2: n2[0],
            r2: n2[1],
            u2l: n2[2],
            u2r: n2[3],
            l2l: n2[4],
            l2r: n2[5],
            dl: deg[0],
            dr: deg[1],
            dul: deg[2],
            dur: deg[3],
            dll: deg[4],
            dlr: deg[5],
        }
    }
}

/// A scheduler/particle policy pair.
///
/// Implementations may be stateful; the engine serializes every invocation
/// through [`PolicyBridge`], so `&mut self` access is never concurrent.
pub trait Policy: Send {
    /// Decides which particles wake this round and under which discipline.
    fn scheduler(&mut self, input: &SchedulerInput) -> Result<SchedulerDecision, PolicyError>;

    /// Chooses the next action for one particle. Returns an action name
    /// from the enumerated set.
    fn particle(&mut self, input: &ParticleInputs) -> Result<String, PolicyError>;
}

/// Serializing wrapper around the shared policy object.
///
/// Policy objects bind parameters by name before execution and are
/// therefore stateful across an invocation; the bridge holds an exclusive
/// lock across the whole (marshal, run, read-result) critical section so
/// concurrent async workers cannot interleave bindings.
#[derive(Clone)]
pub struct PolicyBridge {
    inner: Arc<Mutex<Box<dyn Policy>>>,
}

impl std::fmt::Debug for PolicyBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyBridge").finish_non_exhaustive()
    }
}

impl PolicyBridge {
    /// Wraps a policy object for shared use.
    pub fn new(policy: Box<dyn Policy>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(policy)),
        }
    }

    /// Runs the scheduler policy over the marshaled input.
    ///
    /// # Errors
    /// Propagates [`PolicyError`] from the policy itself.
    pub fn scheduler(&self, input: &SchedulerInput) -> Result<SchedulerDecision, PolicyError> {
        self.inner.lock().scheduler(input)
    }

    /// Runs the particle policy and decodes the returned action name.
    ///
    /// # Errors
    /// Returns [`PolicyError::UnknownAction`] when the returned name is not
    /// in the action set (unparseable names and OBSTACLE alike), or
    /// propagates the policy's own failure.
    pub fn particle(&self, input: &ParticleInputs) -> Result<ParticleState, PolicyError> {
        let name = self.inner.lock().particle(input)?;
        match ParticleState::from_name(&name) {
            Ok(state) if state.is_action() => Ok(state),
            _ => {
                warn!(action = %name, "particle policy returned a name outside the action set");
                Err(PolicyError::UnknownAction(name))
            }
        }
    }
}
