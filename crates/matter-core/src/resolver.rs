// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Move resolution: applies a particle's chosen action to the grid.
//!
//! MOVE is destructive (a cell swap); EXPAND is non-destructive (a single
//! cell tagged with its expansion direction, leaving the neighbor able to
//! see the extension). Collisions never abort a round; they degrade to
//! `move_failed` and, for EXPAND, a collapse to CONTRACTED.

use tracing::debug;

use crate::grid::{Coord, HexGrid};
use crate::state::ParticleState;

/// What the resolver did with one particle's pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// VOID or OBSTACLE cell: no action, nothing slept.
    Untouched,
    /// The particle finished the round in place (including failed moves).
    Settled {
        /// The particle's cell.
        at: Coord,
    },
    /// The particle swapped into an empty neighbor.
    Moved {
        /// Cell vacated by the swap.
        from: Coord,
        /// Cell now holding the particle.
        to: Coord,
    },
}

/// Applies `next_state` for the particle at `at` and puts it to sleep.
///
/// `next_state` is consumed (reset to VOID) on every path that touches a
/// live particle. The caller clears async `awoken` flags using the cells
/// named by the returned [`Resolution`].
pub(crate) fn resolve(grid: &mut HexGrid, at: Coord) -> Resolution {
    let Some(cell) = grid.cell(at) else {
        return Resolution::Untouched;
    };
    let state = cell.state();
    let action = cell.next_state();
    if !state.is_live() {
        return Resolution::Untouched;
    }

    if let Some(dir) = action.move_direction() {
        let (r, c) = at.ring1(dir);
        if grid.safe_state_at(r, c) == ParticleState::Void {
            // The interior check inside safe_state_at guarantees (r, c) is
            // non-negative and in bounds here.
            let to = Coord::new(r as usize, c as usize);
            if grid.swap(at, to).is_ok() {
                if let Some(moved) = grid.cell_mut(to) {
                    moved.set_move_failed(false);
                    moved.set_next_state(ParticleState::Void);
                    moved.set_state(ParticleState::Contracted);
                    moved.sleep();
                }
                return Resolution::Moved { from: at, to };
            }
        }
        debug!(%at, ?dir, "move target occupied");
        if let Some(cell) = grid.cell_mut(at) {
            cell.set_next_state(ParticleState::Void);
            cell.set_move_failed(true);
            cell.sleep();
        }
        return Resolution::Settled { at };
    }

    if let Some(dir) = action.expand_direction() {
        if let Some(cell) = grid.cell_mut(at) {
            if action == state {
                // Already expanded that way; the action is vacuous.
                cell.set_move_failed(false);
                cell.set_next_state(ParticleState::Void);
                cell.sleep();
                return Resolution::Settled { at };
            }
        }
        let (r, c) = at.ring1(dir);
        let target = grid.safe_state_at(r, c);
        let free = matches!(target, ParticleState::Void | ParticleState::Contracted);
        if !free {
            debug!(%at, ?dir, ?target, "expand target blocked, collapsing");
        }
        if let Some(cell) = grid.cell_mut(at) {
            cell.set_next_state(ParticleState::Void);
            if free {
                cell.set_move_failed(false);
                cell.set_state(action);
            } else {
                cell.set_move_failed(true);
                cell.set_state(ParticleState::Contracted);
            }
            cell.sleep();
        }
        return Resolution::Settled { at };
    }

    // VOID, CONTRACTED, or a vacuous tag: adopt it directly.
    if let Some(cell) = grid.cell_mut(at) {
        cell.set_move_failed(false);
        cell.set_next_state(ParticleState::Void);
        cell.set_state(action);
        cell.sleep();
    }
    Resolution::Settled { at }
}
