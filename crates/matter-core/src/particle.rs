// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-cell particle record: state tags, wake/sleep inner state, round
//! counter, and the cached neighborhood written by LOOK.

use thiserror::Error;

use crate::state::{InnerState, ParticleState, StateError};

/// Highest legal first-ring degree (six neighbors in a hex scheme).
pub const MAX_DEGREE: u8 = 6;

/// Errors produced by checked particle mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParticleError {
    /// A state tag failed to decode at the boundary.
    #[error(transparent)]
    State(#[from] StateError),
    /// A degree outside 0..=6.
    #[error("{0} is not a valid degree number")]
    InvalidDegree(u8),
    /// Neighbor lists whose lengths are not 6 and 6.
    #[error("neighbor lists must both have length 6 (got {n1} and {n2})")]
    NeighborArity {
        /// Length of the supplied first-ring list.
        n1: usize,
        /// Length of the supplied second-ring list.
        n2: usize,
    },
    /// A neighbor-degree list whose length is not 6.
    #[error("neighbor degree list must have length 6 (got {0})")]
    DegreeArity(usize),
}

/// Addressable unit of programmable matter occupying one grid cell.
///
/// VOID particles are perpetual placeholders: they carry no meaningful
/// round, neighbors, or degree and are never awakened or scheduled.
#[derive(Debug, Clone, Default)]
pub struct Particle {
    state: ParticleState,
    next_state: ParticleState,
    inner: InnerState,
    round: u64,
    degree: u8,
    neighbors1: [ParticleState; 6],
    neighbors2: [ParticleState; 6],
    neighbor1_deg: [u8; 6],
    move_failed: bool,
}

impl Particle {
    /// Creates a VOID particle with an empty cached neighborhood.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state tag.
    pub fn state(&self) -> ParticleState {
        self.state
    }

    /// Action chosen during COMPUTE; VOID once the resolver consumed it.
    pub fn next_state(&self) -> ParticleState {
        self.next_state
    }

    /// Stamps the action chosen during COMPUTE.
    pub fn set_next_state(&mut self, next: ParticleState) {
        self.next_state = next;
    }

    /// Overwrites the state tag directly. Used by the resolver, which has
    /// already validated the transition.
    pub(crate) fn set_state(&mut self, state: ParticleState) {
        self.state = state;
    }

    /// True while the particle is scheduled in the current round.
    pub fn is_awake(&self) -> bool {
        self.inner == InnerState::Awake
    }

    /// Rounds this particle has participated in so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Most recently observed own degree.
    pub fn degree(&self) -> u8 {
        self.degree
    }

    /// Most recently observed first-ring states.
    pub fn neighbors1(&self) -> &[ParticleState; 6] {
        &self.neighbors1
    }

    /// Most recently observed second-ring states.
    pub fn neighbors2(&self) -> &[ParticleState; 6] {
        &self.neighbors2
    }

    /// Most recently observed first-ring degrees.
    pub fn neighbor1_deg(&self) -> &[u8; 6] {
        &self.neighbor1_deg
    }

    /// Whether the resolver rejected this particle's latest action.
    pub fn move_failed(&self) -> bool {
        self.move_failed
    }

    pub(crate) fn set_move_failed(&mut self, failed: bool) {
        self.move_failed = failed;
    }

    /// Awakes the particle, incrementing its round counter.
    ///
    /// Idempotent: returns `false` (and leaves the round untouched) when
    /// the particle is already awake.
    pub fn awake(&mut self) -> bool {
        if self.inner == InnerState::Awake {
            return false;
        }
        self.inner = InnerState::Awake;
        self.round += 1;
        true
    }

    /// Puts the particle to sleep. Returns `false` when already asleep.
    pub fn sleep(&mut self) -> bool {
        if self.inner == InnerState::Sleep {
            return false;
        }
        self.inner = InnerState::Sleep;
        true
    }

    /// Sets the state from a boundary number.
    ///
    /// # Errors
    /// Returns [`ParticleError::State`] for numbers outside 0..=14.
    pub fn set_state_by_number(&mut self, n: u8) -> Result<(), ParticleError> {
        self.state = ParticleState::from_number(n)?;
        Ok(())
    }

    /// Sets the state from a boundary name.
    ///
    /// # Errors
    /// Returns [`ParticleError::State`] for unknown names.
    pub fn set_state_by_name(&mut self, s: &str) -> Result<(), ParticleError> {
        self.state = ParticleState::from_name(s)?;
        Ok(())
    }

    /// Sets the cached own degree.
    ///
    /// # Errors
    /// Returns [`ParticleError::InvalidDegree`] outside 0..=6.
    pub fn set_degree(&mut self, d: u8) -> Result<(), ParticleError> {
        if d > MAX_DEGREE {
            return Err(ParticleError::InvalidDegree(d));
        }
        self.degree = d;
        Ok(())
    }

    /// Stamps the cached first- and second-ring states.
    ///
    /// # Errors
    /// Returns [`ParticleError::NeighborArity`] unless both lists have
    /// exactly six entries.
    pub fn set_neighbors(
        &mut self,
        n1: &[ParticleState],
        n2: &[ParticleState],
    ) -> Result<(), ParticleError> {
        if n1.len() != 6 || n2.len() != 6 {
            return Err(ParticleError::NeighborArity {
                n1: n1.len(),
                n2: n2.len(),
            });
        }
        self.neighbors1.copy_from_slice(n1);
        self.neighbors2.copy_from_slice(n2);
        Ok(())
    }

    /// Stamps the cached first-ring degrees.
    ///
    /// # Errors
    /// Returns [`ParticleError::DegreeArity`] unless the list has exactly
    /// six entries.
    pub fn set_neighbor_degrees(&mut self, n1_deg: &[u8]) -> Result<(), ParticleError> {
        if n1_deg.len() != 6 {
            return Err(ParticleError::DegreeArity(n1_deg.len()));
        }
        self.neighbor1_deg.copy_from_slice(n1_deg);
        Ok(())
    }

    /// Infallible array-typed stamp used by the probe, which constructs
    /// six-slot rings by type.
    pub(crate) fn stamp_neighborhood(
        &mut self,
        n1: [ParticleState; 6],
        n2: [ParticleState; 6],
    ) {
        self.neighbors1 = n1;
        self.neighbors2 = n2;
    }

    /// Infallible array-typed degree stamp used by the probe.
    pub(crate) fn stamp_neighbor_degrees(&mut self, n1_deg: [u8; 6]) {
        self.neighbor1_deg = n1_deg;
    }

    /// Infallible own-degree stamp used by the probe. The probe derives the
    /// value by counting ring slots, so it is 0..=6 by construction.
    pub(crate) fn stamp_degree(&mut self, d: u8) {
        debug_assert!(d <= MAX_DEGREE, "probe-derived degree out of range");
        self.degree = d;
    }

    /// The cached neighborhood as boundary name tuples, first ring then
    /// second ring, in canonical slot order.
    pub fn neighbors_as_names(&self) -> ([&'static str; 6], [&'static str; 6]) {
        let n1 = std::array::from_fn(|slot| self.neighbors1[slot].name());
        let n2 = std::array::from_fn(|slot| self.neighbors2[slot].name());
        (n1, n2)
    }
}
