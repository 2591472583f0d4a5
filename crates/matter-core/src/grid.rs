// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rectangular hex container with odd-row offset arithmetic.
//!
//! The grid maps (row, column) to [`Particle`]s. Reads through
//! [`HexGrid::safe_state_at`] treat everything outside the interior
//! window `[1, rows-1) x [1, cols-1)` as OBSTACLE, so the one-cell border
//! is permanently opaque to policies.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::particle::{Particle, MAX_DEGREE};
use crate::state::{Direction, ParticleState};

/// Errors produced by grid addressing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// A coordinate outside the grid.
    #[error("coordinate ({row},{col}) outside {rows}x{cols} grid")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
    },
    /// A coordinate string that is not `"row,col"` with unsigned parts.
    #[error("'{0}' is not a valid coordinate (expected \"row,col\")")]
    CoordFormat(String),
}

/// A (row, column) grid address.
///
/// Displays and parses as the boundary encoding `"row,col"` used by the
/// scheduler-policy contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl Coord {
    /// Creates a coordinate.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The signed coordinate of the first-ring neighbor in `dir`.
    pub fn ring1(self, dir: Direction) -> (isize, isize) {
        let (dr, dc) = dir.ring1_offset(self.row as isize);
        (self.row as isize + dr, self.col as isize + dc)
    }

    /// The signed coordinate of the second-ring cell in `dir`.
    pub fn ring2(self, dir: Direction) -> (isize, isize) {
        let (dr, dc) = dir.ring2_offset();
        (self.row as isize + dr, self.col as isize + dc)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for Coord {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || GridError::CoordFormat(s.to_owned());
        let (row, col) = s.split_once(',').ok_or_else(bad)?;
        let row = row.trim().parse::<usize>().map_err(|_| bad())?;
        let col = col.trim().parse::<usize>().map_err(|_| bad())?;
        Ok(Self { row, col })
    }
}

/// Grid shape derived from a viewport and hex size.
///
/// A hex of size `s` spans `2s` pixels across and `sqrt(3)*s` tall; rows
/// and columns are laid out at half-cell pitch with one extra cell so the
/// viewport is fully covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl GridGeometry {
    /// Derives the grid shape for a viewport of `width x height` pixels
    /// populated by hexes of `hex_size` pixels.
    pub fn from_viewport(width: u32, height: u32, hex_size: u32) -> Self {
        let hex = f64::from(hex_size.max(1));
        let half_w = hex; // cell width is 2*hex
        let half_h = (3f64.sqrt() * hex) / 2.0;
        let rows = (f64::from(height) / half_h).floor() as usize + 1;
        let cols = (f64::from(width) / half_w).floor() as usize + 1;
        Self { rows, cols }
    }
}

/// Rectangular mapping from (row, column) to [`Particle`].
#[derive(Debug, Clone)]
pub struct HexGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Particle>,
}

impl HexGrid {
    /// Creates a `rows x cols` grid of VOID particles.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Particle::new(); rows * cols],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total cell count (`rows * cols`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the grid holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major backing index of `at`, if in bounds.
    pub fn index_of(&self, at: Coord) -> Option<usize> {
        (at.row < self.rows && at.col < self.cols).then(|| at.row * self.cols + at.col)
    }

    /// In-bounds cell access.
    pub fn cell(&self, at: Coord) -> Option<&Particle> {
        self.index_of(at).map(|i| &self.cells[i])
    }

    /// In-bounds mutable cell access.
    pub fn cell_mut(&mut self, at: Coord) -> Option<&mut Particle> {
        self.index_of(at).map(|i| &mut self.cells[i])
    }

    /// Fallible cell access.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn try_cell(&self, at: Coord) -> Result<&Particle, GridError> {
        self.cell(at).ok_or(GridError::OutOfBounds {
            row: at.row,
            col: at.col,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Fallible mutable cell access.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn try_cell_mut(&mut self, at: Coord) -> Result<&mut Particle, GridError> {
        let (rows, cols) = (self.rows, self.cols);
        self.cell_mut(at).ok_or(GridError::OutOfBounds {
            row: at.row,
            col: at.col,
            rows,
            cols,
        })
    }

    /// True when the signed coordinate lies inside the opaque border, i.e.
    /// in the interior window `[1, rows-1) x [1, cols-1)`.
    pub fn in_interior(&self, row: isize, col: isize) -> bool {
        row >= 1
            && col >= 1
            && row < self.rows as isize - 1
            && col < self.cols as isize - 1
    }

    /// Border-safe state read: OBSTACLE anywhere outside the interior
    /// window, the live state otherwise.
    pub fn safe_state_at(&self, row: isize, col: isize) -> ParticleState {
        if !self.in_interior(row, col) {
            return ParticleState::Obstacle;
        }
        self.cells[row as usize * self.cols + col as usize].state()
    }

    /// Border-safe degree read: the border reads as a fully connected wall
    /// (degree 6), the interior as the cell's cached degree.
    pub fn safe_degree_at(&self, row: isize, col: isize) -> u8 {
        if !self.in_interior(row, col) {
            return MAX_DEGREE;
        }
        self.cells[row as usize * self.cols + col as usize].degree()
    }

    /// Atomic exchange of two cells. Used to implement MOVE.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] if either coordinate is outside
    /// the grid.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), GridError> {
        let ia = self.index_of(a).ok_or(GridError::OutOfBounds {
            row: a.row,
            col: a.col,
            rows: self.rows,
            cols: self.cols,
        })?;
        let ib = self.index_of(b).ok_or(GridError::OutOfBounds {
            row: b.row,
            col: b.col,
            rows: self.rows,
            cols: self.cols,
        })?;
        self.cells.swap(ia, ib);
        Ok(())
    }

    /// Row-major iterator over every coordinate.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Coord { row, col }))
    }

    /// Row-major iterator over live (non-VOID, non-OBSTACLE) coordinates.
    pub fn live_coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.coords().filter(|&at| {
            self.cell(at)
                .map(|p| p.state().is_live())
                .unwrap_or_default()
        })
    }

    /// Count of live particles.
    pub fn live_count(&self) -> usize {
        self.live_coords().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_boundary_encoding_round_trips() {
        let c = Coord::new(3, 17);
        assert_eq!(c.to_string(), "3,17");
        assert_eq!("3,17".parse::<Coord>(), Ok(c));
        assert_eq!("3, 17".parse::<Coord>(), Ok(c));
        assert!("3".parse::<Coord>().is_err());
        assert!("a,b".parse::<Coord>().is_err());
        assert!("-1,2".parse::<Coord>().is_err());
    }

    #[test]
    fn new_grid_is_all_void() {
        let grid = HexGrid::new(3, 5);
        assert_eq!(grid.len(), 15);
        for at in grid.coords() {
            let Some(cell) = grid.cell(at) else {
                unreachable!("coords() yields in-bounds coordinates");
            };
            assert_eq!(cell.state(), ParticleState::Void);
        }
        assert_eq!(grid.live_count(), 0);
    }

    #[test]
    fn safe_state_treats_border_as_obstacle() {
        let mut grid = HexGrid::new(4, 4);
        let Some(cell) = grid.cell_mut(Coord::new(1, 1)) else {
            unreachable!("(1,1) is in bounds");
        };
        cell.set_state(ParticleState::Contracted);

        assert_eq!(grid.safe_state_at(1, 1), ParticleState::Contracted);
        // Border ring and out-of-bounds both read OBSTACLE.
        assert_eq!(grid.safe_state_at(0, 1), ParticleState::Obstacle);
        assert_eq!(grid.safe_state_at(3, 1), ParticleState::Obstacle);
        assert_eq!(grid.safe_state_at(1, 0), ParticleState::Obstacle);
        assert_eq!(grid.safe_state_at(1, 3), ParticleState::Obstacle);
        assert_eq!(grid.safe_state_at(-1, 2), ParticleState::Obstacle);
        assert_eq!(grid.safe_state_at(2, 99), ParticleState::Obstacle);
    }

    #[test]
    fn safe_degree_reads_border_as_full_wall() {
        let mut grid = HexGrid::new(4, 4);
        let Some(cell) = grid.cell_mut(Coord::new(2, 2)) else {
            unreachable!("(2,2) is in bounds");
        };
        let Ok(()) = cell.set_degree(3) else {
            unreachable!("3 is a valid degree");
        };
        assert_eq!(grid.safe_degree_at(2, 2), 3);
        assert_eq!(grid.safe_degree_at(0, 0), MAX_DEGREE);
        assert_eq!(grid.safe_degree_at(-2, 1), MAX_DEGREE);
    }

    #[test]
    fn swap_exchanges_whole_cells() {
        let mut grid = HexGrid::new(3, 5);
        let a = Coord::new(1, 1);
        let b = Coord::new(1, 2);
        let Some(cell) = grid.cell_mut(a) else {
            unreachable!("in bounds");
        };
        cell.set_state(ParticleState::Contracted);
        assert!(cell.awake());

        let Ok(()) = grid.swap(a, b) else {
            unreachable!("both coordinates in bounds");
        };
        let (Some(at_a), Some(at_b)) = (grid.cell(a), grid.cell(b)) else {
            unreachable!("in bounds");
        };
        assert_eq!(at_a.state(), ParticleState::Void);
        assert_eq!(at_b.state(), ParticleState::Contracted);
        assert_eq!(at_b.round(), 1, "identity travels with the particle");
        assert!(grid.swap(a, Coord::new(9, 9)).is_err());
    }

    #[test]
    fn viewport_geometry_matches_half_pitch_layout() {
        // 800x600 viewport, hex size 16: half_w = 16, half_h = sqrt(3)*8.
        let g = GridGeometry::from_viewport(800, 600, 16);
        assert_eq!(g.cols, 51);
        assert_eq!(g.rows, 44);
        // Degenerate hex size is clamped rather than dividing by zero.
        let tiny = GridGeometry::from_viewport(10, 10, 0);
        assert!(tiny.rows > 0 && tiny.cols > 0);
    }

    #[test]
    fn live_coords_are_row_major() {
        let mut grid = HexGrid::new(4, 4);
        for at in [Coord::new(2, 1), Coord::new(1, 2), Coord::new(1, 1)] {
            let Some(cell) = grid.cell_mut(at) else {
                unreachable!("in bounds");
            };
            cell.set_state(ParticleState::Contracted);
        }
        let live: Vec<Coord> = grid.live_coords().collect();
        assert_eq!(
            live,
            vec![Coord::new(1, 1), Coord::new(1, 2), Coord::new(2, 1)],
            "enumeration must be row-major"
        );
    }
}
