// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rule-table policy adapter.
//!
//! A [`TablePolicy`] evaluates an ordered list of predicate rows against
//! the named particle inputs; the first row whose predicates all hold
//! chooses the action. This is the built-in adapter: it exercises the
//! whole policy contract without an embedded evaluator.

use crate::policy::{
    ParticleInputs, Policy, PolicyError, RoundDiscipline, SchedulerDecision, SchedulerInput,
};
use crate::state::{Direction, ParticleState};

/// A condition over one named particle input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Own state equals the tag.
    StateIs(ParticleState),
    /// The first-ring slot holds the tag.
    Neighbor1Is(Direction, ParticleState),
    /// The second-ring slot holds the tag.
    Neighbor2Is(Direction, ParticleState),
    /// The first-ring slot's degree equals the value.
    Degree1Is(Direction, u8),
}

impl Predicate {
    fn holds(self, inputs: &ParticleInputs) -> bool {
        match self {
            Self::StateIs(tag) => inputs.state == tag.name(),
            Self::Neighbor1Is(dir, tag) => ring1_of(inputs, dir) == tag.name(),
            Self::Neighbor2Is(dir, tag) => ring2_of(inputs, dir) == tag.name(),
            Self::Degree1Is(dir, value) => degree_of(inputs, dir) == value,
        }
    }
}

fn ring1_of(inputs: &ParticleInputs, dir: Direction) -> &'static str {
    match dir {
        Direction::L => inputs.l,
        Direction::R => inputs.r,
        Direction::Ul => inputs.ul,
        Direction::Ur => inputs.ur,
        Direction::Ll => inputs.ll,
        Direction::Lr => inputs.lr,
    }
}

fn ring2_of(inputs: &ParticleInputs, dir: Direction) -> &'static str {
    match dir {
        Direction::L => inputs.l2,
        Direction::R => inputs.r2,
        Direction::Ul => inputs.u2l,
        Direction::Ur => inputs.u2r,
        Direction::Ll => inputs.l2l,
        Direction::Lr => inputs.l2r,
    }
}

fn degree_of(inputs: &ParticleInputs, dir: Direction) -> u8 {
    match dir {
        Direction::L => inputs.dl,
        Direction::R => inputs.dr,
        Direction::Ul => inputs.dul,
        Direction::Ur => inputs.dur,
        Direction::Ll => inputs.dll,
        Direction::Lr => inputs.dlr,
    }
}

/// One row of the rule table: fire `action` when every predicate holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRule {
    predicates: Vec<Predicate>,
    action: ParticleState,
}

impl TableRule {
    /// A row that always fires.
    pub fn always(action: ParticleState) -> Self {
        Self {
            predicates: Vec::new(),
            action,
        }
    }

    /// A row guarded by the given predicates (conjunction).
    pub fn when(predicates: impl Into<Vec<Predicate>>, action: ParticleState) -> Self {
        Self {
            predicates: predicates.into(),
            action,
        }
    }

    fn matches(&self, inputs: &ParticleInputs) -> bool {
        self.predicates.iter().all(|p| p.holds(inputs))
    }
}

/// Which particles the scheduler decision marks active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveSelection {
    /// Every particle the scheduler was shown.
    #[default]
    All,
    /// No explicit actives; pair with the event-driven flags.
    None,
}

/// The built-in rule-table policy.
///
/// The scheduler half returns a fixed decision template; the particle half
/// evaluates the table. With no matching row the particle echoes its own
/// state, which the resolver treats as a vacuous transition.
#[derive(Debug, Clone)]
pub struct TablePolicy {
    discipline: RoundDiscipline,
    selection: ActiveSelection,
    event_driven: bool,
    event_driven_with_blocks: bool,
    rules: Vec<TableRule>,
    fallback: Option<ParticleState>,
}

impl TablePolicy {
    /// A policy scheduling every particle under the synchronous discipline.
    pub fn synchronous() -> Self {
        Self {
            discipline: RoundDiscipline::Sync,
            selection: ActiveSelection::All,
            event_driven: false,
            event_driven_with_blocks: false,
            rules: Vec::new(),
            fallback: None,
        }
    }

    /// A policy scheduling every particle under the asynchronous discipline.
    pub fn asynchronous() -> Self {
        Self {
            discipline: RoundDiscipline::Async,
            ..Self::synchronous()
        }
    }

    /// An event-driven asynchronous policy with no explicit actives.
    pub fn event_driven(with_blocks: bool) -> Self {
        Self {
            discipline: RoundDiscipline::Async,
            selection: ActiveSelection::None,
            event_driven: true,
            event_driven_with_blocks: with_blocks,
            rules: Vec::new(),
            fallback: None,
        }
    }

    /// Appends a rule row. Rows are evaluated in insertion order.
    #[must_use]
    pub fn with_rule(mut self, rule: TableRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the action used when no row matches (default: echo own state).
    #[must_use]
    pub fn with_fallback(mut self, action: ParticleState) -> Self {
        self.fallback = Some(action);
        self
    }
}

impl Policy for TablePolicy {
    fn scheduler(&mut self, input: &SchedulerInput) -> Result<SchedulerDecision, PolicyError> {
        let active_particles = match self.selection {
            ActiveSelection::All => input.particles.clone(),
            ActiveSelection::None => Vec::new(),
        };
        Ok(SchedulerDecision {
            active_particles,
            discipline: self.discipline,
            event_driven: self.event_driven,
            event_driven_with_blocks: self.event_driven_with_blocks,
        })
    }

    fn particle(&mut self, input: &ParticleInputs) -> Result<String, PolicyError> {
        for rule in &self.rules {
            if rule.matches(input) {
                return Ok(rule.action.name().to_owned());
            }
        }
        match self.fallback {
            Some(action) => Ok(action.name().to_owned()),
            None => Ok(input.state.to_owned()),
        }
    }
}
