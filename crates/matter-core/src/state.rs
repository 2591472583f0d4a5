// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Particle state tags, hex directions, and the name/number boundary codec.
//!
//! States are stringly addressed across the policy boundary; the core keeps
//! this compact tagged representation and converts only at the edge.

use thiserror::Error;

/// Errors produced when decoding a state tag from the policy boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// A numeric tag outside the enumerated set (0..=14).
    #[error("{0} is not a valid state number")]
    InvalidNumber(u8),
    /// A name that is not one of the enumerated tag names.
    #[error("'{0}' is not a valid state name")]
    InvalidName(String),
}

/// The six hex directions, in the canonical slot order used by every
/// neighbor list in the engine: L, R, UL, UR, LL, LR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left.
    L,
    /// Right.
    R,
    /// Upper left.
    Ul,
    /// Upper right.
    Ur,
    /// Lower left.
    Ll,
    /// Lower right.
    Lr,
}

impl Direction {
    /// All six directions in canonical slot order.
    pub const ALL: [Self; 6] = [Self::L, Self::R, Self::Ul, Self::Ur, Self::Ll, Self::Lr];

    /// First-ring (row, column) offset under the odd-row-offset scheme.
    ///
    /// Offsets depend on the parity of `row`: odd rows shear right, even
    /// rows shear left.
    pub fn ring1_offset(self, row: isize) -> (isize, isize) {
        if row.rem_euclid(2) == 1 {
            match self {
                Self::L => (0, -1),
                Self::R => (0, 1),
                Self::Ul => (-1, 0),
                Self::Ur => (-1, 1),
                Self::Ll => (1, 0),
                Self::Lr => (1, 1),
            }
        } else {
            match self {
                Self::L => (0, -1),
                Self::R => (0, 1),
                Self::Ul => (-1, -1),
                Self::Ur => (-1, 0),
                Self::Ll => (1, -1),
                Self::Lr => (1, 0),
            }
        }
    }

    /// Second-ring (row, column) offset: the cell two straight-line steps
    /// away in this direction.
    ///
    /// Composing the parity rule twice cancels the shear, so these offsets
    /// are independent of row parity.
    pub fn ring2_offset(self) -> (isize, isize) {
        match self {
            Self::L => (0, -2),
            Self::R => (0, 2),
            Self::Ul => (-2, -1),
            Self::Ur => (-2, 1),
            Self::Ll => (2, -1),
            Self::Lr => (2, 1),
        }
    }

    /// Input key for this slot's first-ring state (`l`, `r`, `ul`, ...).
    pub fn ring1_key(self) -> &'static str {
        match self {
            Self::L => "l",
            Self::R => "r",
            Self::Ul => "ul",
            Self::Ur => "ur",
            Self::Ll => "ll",
            Self::Lr => "lr",
        }
    }

    /// Input key for this slot's second-ring state (`l2`, `r2`, `u2l`, ...).
    pub fn ring2_key(self) -> &'static str {
        match self {
            Self::L => "l2",
            Self::R => "r2",
            Self::Ul => "u2l",
            Self::Ur => "u2r",
            Self::Ll => "l2l",
            Self::Lr => "l2r",
        }
    }

    /// Input key for this slot's first-ring degree (`dl`, `dr`, `dul`, ...).
    pub fn degree_key(self) -> &'static str {
        match self {
            Self::L => "dl",
            Self::R => "dr",
            Self::Ul => "dul",
            Self::Ur => "dur",
            Self::Ll => "dll",
            Self::Lr => "dlr",
        }
    }
}

/// Whether a particle has been scheduled in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InnerState {
    /// Not scheduled; eligible for the next round.
    #[default]
    Sleep,
    /// Scheduled and executing the current round.
    Awake,
}

/// State tag of a grid cell.
///
/// The numbering is the bit-exact boundary encoding used by `init_state`
/// documents and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ParticleState {
    /// Perpetual placeholder for an empty cell.
    #[default]
    Void = 0,
    /// Resting particle occupying a single cell.
    Contracted = 1,
    /// Body extended toward the left neighbor.
    ExpandL = 2,
    /// Body extended toward the right neighbor.
    ExpandR = 3,
    /// Body extended toward the upper-left neighbor.
    ExpandUl = 4,
    /// Body extended toward the upper-right neighbor.
    ExpandUr = 5,
    /// Body extended toward the lower-left neighbor.
    ExpandLl = 6,
    /// Body extended toward the lower-right neighbor.
    ExpandLr = 7,
    /// Request to translate into the left neighbor.
    MoveL = 8,
    /// Request to translate into the right neighbor.
    MoveR = 9,
    /// Request to translate into the upper-left neighbor.
    MoveUl = 10,
    /// Request to translate into the upper-right neighbor.
    MoveUr = 11,
    /// Request to translate into the lower-left neighbor.
    MoveLl = 12,
    /// Request to translate into the lower-right neighbor.
    MoveLr = 13,
    /// Immovable, impassable cell.
    Obstacle = 14,
}

impl ParticleState {
    /// Decodes a boundary state number.
    ///
    /// # Errors
    /// Returns [`StateError::InvalidNumber`] outside 0..=14.
    pub fn from_number(n: u8) -> Result<Self, StateError> {
        match n {
            0 => Ok(Self::Void),
            1 => Ok(Self::Contracted),
            2 => Ok(Self::ExpandL),
            3 => Ok(Self::ExpandR),
            4 => Ok(Self::ExpandUl),
            5 => Ok(Self::ExpandUr),
            6 => Ok(Self::ExpandLl),
            7 => Ok(Self::ExpandLr),
            8 => Ok(Self::MoveL),
            9 => Ok(Self::MoveR),
            10 => Ok(Self::MoveUl),
            11 => Ok(Self::MoveUr),
            12 => Ok(Self::MoveLl),
            13 => Ok(Self::MoveLr),
            14 => Ok(Self::Obstacle),
            other => Err(StateError::InvalidNumber(other)),
        }
    }

    /// Decodes a boundary state name.
    ///
    /// # Errors
    /// Returns [`StateError::InvalidName`] for anything outside the
    /// enumerated tag names.
    pub fn from_name(s: &str) -> Result<Self, StateError> {
        match s {
            "VOID" => Ok(Self::Void),
            "CONTRACTED" => Ok(Self::Contracted),
            "EXPANDL" => Ok(Self::ExpandL),
            "EXPANDR" => Ok(Self::ExpandR),
            "EXPANDUL" => Ok(Self::ExpandUl),
            "EXPANDUR" => Ok(Self::ExpandUr),
            "EXPANDLL" => Ok(Self::ExpandLl),
            "EXPANDLR" => Ok(Self::ExpandLr),
            "MOVEL" => Ok(Self::MoveL),
            "MOVER" => Ok(Self::MoveR),
            "MOVEUL" => Ok(Self::MoveUl),
            "MOVEUR" => Ok(Self::MoveUr),
            "MOVELL" => Ok(Self::MoveLl),
            "MOVELR" => Ok(Self::MoveLr),
            "OBSTACLE" => Ok(Self::Obstacle),
            other => Err(StateError::InvalidName(other.to_owned())),
        }
    }

    /// The boundary state number for this tag.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The boundary name for this tag.
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "VOID",
            Self::Contracted => "CONTRACTED",
            Self::ExpandL => "EXPANDL",
            Self::ExpandR => "EXPANDR",
            Self::ExpandUl => "EXPANDUL",
            Self::ExpandUr => "EXPANDUR",
            Self::ExpandLl => "EXPANDLL",
            Self::ExpandLr => "EXPANDLR",
            Self::MoveL => "MOVEL",
            Self::MoveR => "MOVER",
            Self::MoveUl => "MOVEUL",
            Self::MoveUr => "MOVEUR",
            Self::MoveLl => "MOVELL",
            Self::MoveLr => "MOVELR",
            Self::Obstacle => "OBSTACLE",
        }
    }

    /// True for every tag a transition policy may legally return.
    ///
    /// OBSTACLE is not an action: obstacles are immutable after bootstrap.
    pub fn is_action(self) -> bool {
        !matches!(self, Self::Obstacle)
    }

    /// True for cells that participate in rounds (neither VOID nor OBSTACLE).
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Void | Self::Obstacle)
    }

    /// The direction of a MOVE tag, if this is one.
    pub fn move_direction(self) -> Option<Direction> {
        match self {
            Self::MoveL => Some(Direction::L),
            Self::MoveR => Some(Direction::R),
            Self::MoveUl => Some(Direction::Ul),
            Self::MoveUr => Some(Direction::Ur),
            Self::MoveLl => Some(Direction::Ll),
            Self::MoveLr => Some(Direction::Lr),
            _ => None,
        }
    }

    /// The direction of an EXPAND tag, if this is one.
    pub fn expand_direction(self) -> Option<Direction> {
        match self {
            Self::ExpandL => Some(Direction::L),
            Self::ExpandR => Some(Direction::R),
            Self::ExpandUl => Some(Direction::Ul),
            Self::ExpandUr => Some(Direction::Ur),
            Self::ExpandLl => Some(Direction::Ll),
            Self::ExpandLr => Some(Direction::Lr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_round_trips_bit_exact() {
        for n in 0u8..=14 {
            let Ok(state) = ParticleState::from_number(n) else {
                unreachable!("number {n} must decode");
            };
            assert_eq!(state.number(), n, "state numbering must be stable");
        }
        assert_eq!(
            ParticleState::from_number(15),
            Err(StateError::InvalidNumber(15))
        );
    }

    #[test]
    fn names_round_trip() {
        for n in 0u8..=14 {
            let Ok(state) = ParticleState::from_number(n) else {
                unreachable!("number {n} must decode");
            };
            assert_eq!(ParticleState::from_name(state.name()), Ok(state));
        }
        assert!(ParticleState::from_name("contracted").is_err());
        assert!(ParticleState::from_name("").is_err());
    }

    #[test]
    fn obstacle_is_not_an_action() {
        assert!(!ParticleState::Obstacle.is_action());
        assert!(ParticleState::Void.is_action());
        assert!(ParticleState::MoveUr.is_action());
    }

    #[test]
    fn live_excludes_void_and_obstacle() {
        assert!(!ParticleState::Void.is_live());
        assert!(!ParticleState::Obstacle.is_live());
        assert!(ParticleState::Contracted.is_live());
        assert!(ParticleState::ExpandLl.is_live());
    }

    #[test]
    fn ring1_offsets_follow_row_parity() {
        // Odd rows shear right.
        assert_eq!(Direction::Ul.ring1_offset(1), (-1, 0));
        assert_eq!(Direction::Ur.ring1_offset(1), (-1, 1));
        // Even rows shear left.
        assert_eq!(Direction::Ul.ring1_offset(2), (-1, -1));
        assert_eq!(Direction::Ur.ring1_offset(2), (-1, 0));
        // L and R ignore parity.
        assert_eq!(Direction::L.ring1_offset(1), Direction::L.ring1_offset(2));
        assert_eq!(Direction::R.ring1_offset(1), Direction::R.ring1_offset(2));
    }

    #[test]
    fn ring2_offset_composes_ring1_twice() {
        for dir in Direction::ALL {
            for row in 0isize..4 {
                let (dr1, dc1) = dir.ring1_offset(row);
                let (dr2, dc2) = dir.ring1_offset(row + dr1);
                assert_eq!(
                    dir.ring2_offset(),
                    (dr1 + dr2, dc1 + dc2),
                    "second ring must be two straight-line steps ({dir:?}, row {row})"
                );
            }
        }
    }

    #[test]
    fn move_and_expand_directions_project() {
        assert_eq!(ParticleState::MoveR.move_direction(), Some(Direction::R));
        assert_eq!(ParticleState::ExpandLr.expand_direction(), Some(Direction::Lr));
        assert_eq!(ParticleState::Contracted.move_direction(), None);
        assert_eq!(ParticleState::MoveL.expand_direction(), None);
    }
}
