// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in demo policies for drivers and tests.

use super::{PolicyShelf, Predicate, TablePolicy, TableRule};
use crate::state::{Direction, ParticleState};

/// Shelf name of the policy under which every particle holds its state.
pub const HOLD_POLICY_NAME: &str = "hold";

/// Shelf name of the policy that marches contracted particles rightward,
/// one cell per round, when the right neighbor is empty.
pub const MARCH_RIGHT_POLICY_NAME: &str = "march-right";

/// Shelf name of the policy that alternates expand-right / contract.
pub const PULSE_RIGHT_POLICY_NAME: &str = "pulse-right";

fn hold() -> TablePolicy {
    TablePolicy::synchronous().with_rule(TableRule::always(ParticleState::Contracted))
}

fn march_right() -> TablePolicy {
    TablePolicy::synchronous()
        .with_rule(TableRule::when(
            [
                Predicate::StateIs(ParticleState::Contracted),
                Predicate::Neighbor1Is(Direction::R, ParticleState::Void),
            ],
            ParticleState::MoveR,
        ))
        .with_rule(TableRule::always(ParticleState::Contracted))
}

fn pulse_right() -> TablePolicy {
    TablePolicy::synchronous()
        .with_rule(TableRule::when(
            [Predicate::StateIs(ParticleState::Contracted)],
            ParticleState::ExpandR,
        ))
        .with_rule(TableRule::when(
            [Predicate::StateIs(ParticleState::ExpandR)],
            ParticleState::Contracted,
        ))
}

/// The shelf of built-in policies, in a stable registration order so
/// cyclic selection lands predictably.
pub fn builtin_shelf() -> PolicyShelf {
    let mut shelf = PolicyShelf::new();
    shelf.register(HOLD_POLICY_NAME, || Box::new(hold()));
    shelf.register(MARCH_RIGHT_POLICY_NAME, || Box::new(march_right()));
    shelf.register(PULSE_RIGHT_POLICY_NAME, || Box::new(pulse_right()));
    shelf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shelf_selection_is_stable() {
        let shelf = builtin_shelf();
        assert_eq!(shelf.len(), 3);
        assert_eq!(shelf.select(1), Ok(HOLD_POLICY_NAME));
        assert_eq!(shelf.select(2), Ok(MARCH_RIGHT_POLICY_NAME));
        assert_eq!(shelf.select(0), Ok(PULSE_RIGHT_POLICY_NAME));
        assert!(shelf.build(MARCH_RIGHT_POLICY_NAME).is_some());
    }
}
