// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Neighborhood observation: single-cell probes and the bulk LOOK pass.
//!
//! Degree caching is a two-pass fixpoint: pass one writes each live cell's
//! own degree from its freshly observed first ring; pass two writes each
//! cell's neighbor degrees from the pass-one values. Splitting the passes
//! keeps `neighbor1_deg` consistent with what every *other* cell computed
//! this round, which is what lets policies see 2-hop connectivity.

use crate::grid::{Coord, HexGrid};
use crate::particle::MAX_DEGREE;
use crate::state::{Direction, ParticleState};

/// A snapshot of one cell's neighborhood at observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// First-ring states in canonical slot order (L, R, UL, UR, LL, LR).
    pub n1: [ParticleState; 6],
    /// Second-ring states in canonical slot order (2L, 2R, U2L, U2R, L2L, L2R).
    pub n2: [ParticleState; 6],
    /// First-ring degrees; out-of-window slots read as a full wall (6).
    pub n1_deg: [u8; 6],
    /// Degree of the observed cell: live first-ring neighbors in 0..=6.
    pub degree: u8,
}

/// Observes the two rings around `at` through the border-safe accessors.
pub fn observe(grid: &HexGrid, at: Coord) -> Observation {
    let mut n1 = [ParticleState::Obstacle; 6];
    let mut n2 = [ParticleState::Obstacle; 6];
    let mut n1_deg = [MAX_DEGREE; 6];

    for (slot, dir) in Direction::ALL.into_iter().enumerate() {
        let (r1, c1) = at.ring1(dir);
        n1[slot] = grid.safe_state_at(r1, c1);
        n1_deg[slot] = grid.safe_degree_at(r1, c1);
        let (r2, c2) = at.ring2(dir);
        n2[slot] = grid.safe_state_at(r2, c2);
    }

    let degree = n1.iter().filter(|s| s.is_live()).count() as u8;
    Observation {
        n1,
        n2,
        n1_deg,
        degree,
    }
}

/// Bulk LOOK: refreshes every live cell's cached neighborhood.
///
/// Pass one stamps rings and own degrees; pass two stamps each cell's view
/// of its neighbors' pass-one degrees. VOID and OBSTACLE cells are skipped
/// entirely; they carry no neighborhood.
pub fn refresh_all(grid: &mut HexGrid) {
    let live: Vec<Coord> = grid.live_coords().collect();

    for &at in &live {
        let obs = observe(grid, at);
        if let Some(cell) = grid.cell_mut(at) {
            cell.stamp_neighborhood(obs.n1, obs.n2);
            cell.stamp_degree(obs.degree);
        }
    }

    for &at in &live {
        let mut n1_deg = [MAX_DEGREE; 6];
        for (slot, dir) in Direction::ALL.into_iter().enumerate() {
            let (r, c) = at.ring1(dir);
            n1_deg[slot] = grid.safe_degree_at(r, c);
        }
        if let Some(cell) = grid.cell_mut(at) {
            cell.stamp_neighbor_degrees(n1_deg);
        }
    }
}

/// Stamps a single cell from an [`Observation`]. Used by the async LOOK
/// phase, which probes exactly one cell per worker.
pub fn stamp(grid: &mut HexGrid, at: Coord, obs: &Observation) {
    if let Some(cell) = grid.cell_mut(at) {
        cell.stamp_neighborhood(obs.n1, obs.n2);
        cell.stamp_degree(obs.degree);
        cell.stamp_neighbor_degrees(obs.n1_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(rows: usize, cols: usize, cells: &[(usize, usize, ParticleState)]) -> HexGrid {
        let mut grid = HexGrid::new(rows, cols);
        for &(r, c, s) in cells {
            let Some(cell) = grid.cell_mut(Coord::new(r, c)) else {
                unreachable!("seed coordinate in bounds");
            };
            cell.set_state(s);
        }
        grid
    }

    #[test]
    fn observe_reads_rings_with_parity() {
        // Row 1 is odd: UR of (1,1) is (0,2), which is border, so OBSTACLE;
        // LR of (1,1) is (2,2).
        let grid = seeded(
            5,
            5,
            &[
                (1, 1, ParticleState::Contracted),
                (1, 2, ParticleState::Contracted),
                (2, 2, ParticleState::ExpandR),
            ],
        );
        let obs = observe(&grid, Coord::new(1, 1));
        assert_eq!(obs.n1[1], ParticleState::Contracted, "R is (1,2)");
        assert_eq!(obs.n1[5], ParticleState::ExpandR, "LR is (2,2) on odd rows");
        assert_eq!(obs.n1[0], ParticleState::Obstacle, "L is border (1,0)");
        assert_eq!(obs.degree, 2, "two live first-ring neighbors");
    }

    #[test]
    fn observe_second_ring_is_parity_independent() {
        let grid = seeded(
            7,
            7,
            &[
                (3, 3, ParticleState::Contracted),
                (3, 5, ParticleState::Contracted), // 2R
                (1, 2, ParticleState::ExpandL),    // U2L
                (5, 4, ParticleState::ExpandR),    // L2R
            ],
        );
        let obs = observe(&grid, Coord::new(3, 3));
        assert_eq!(obs.n2[1], ParticleState::Contracted, "2R is (3,5)");
        assert_eq!(obs.n2[2], ParticleState::ExpandL, "U2L is (1,2)");
        assert_eq!(obs.n2[5], ParticleState::ExpandR, "L2R is (5,4)");
        assert_eq!(obs.n2[0], ParticleState::Void, "2L is (3,1), VOID");
    }

    #[test]
    fn refresh_all_runs_the_two_pass_degree_fixpoint() {
        // (1,1) and (1,2) are adjacent; (1,2) and (1,3) are adjacent.
        let mut grid = seeded(
            4,
            6,
            &[
                (1, 1, ParticleState::Contracted),
                (1, 2, ParticleState::Contracted),
                (1, 3, ParticleState::Contracted),
            ],
        );
        refresh_all(&mut grid);

        let Some(mid) = grid.cell(Coord::new(1, 2)) else {
            unreachable!("in bounds");
        };
        assert_eq!(mid.degree(), 2, "middle particle sees both ends");
        // Its L slot holds (1,1)'s pass-one degree.
        assert_eq!(mid.neighbor1_deg()[0], 1, "left end has degree 1");
        assert_eq!(mid.neighbor1_deg()[1], 1, "right end has degree 1");
        // Border slots read as a full wall.
        let Some(left) = grid.cell(Coord::new(1, 1)) else {
            unreachable!("in bounds");
        };
        assert_eq!(left.neighbor1_deg()[0], MAX_DEGREE, "L of (1,1) is border");
        let (n1, _) = left.neighbors_as_names();
        assert_eq!(n1[1], "CONTRACTED");
    }

    #[test]
    fn refresh_all_skips_void_and_obstacle() {
        let mut grid = seeded(
            4,
            4,
            &[
                (1, 1, ParticleState::Obstacle),
                (2, 2, ParticleState::Contracted),
            ],
        );
        refresh_all(&mut grid);
        let Some(rock) = grid.cell(Coord::new(1, 1)) else {
            unreachable!("in bounds");
        };
        assert_eq!(rock.degree(), 0, "obstacles keep their zero degree");
        let Some(empty) = grid.cell(Coord::new(2, 1)) else {
            unreachable!("in bounds");
        };
        assert_eq!(empty.neighbors1(), &[ParticleState::Void; 6]);
    }

    #[test]
    fn neighbor_symmetry_after_bulk_refresh() {
        let mut grid = seeded(
            5,
            5,
            &[
                (1, 1, ParticleState::Contracted),
                (2, 2, ParticleState::ExpandUl),
                (3, 1, ParticleState::Contracted),
            ],
        );
        refresh_all(&mut grid);
        for at in grid.live_coords().collect::<Vec<_>>() {
            let Some(cell) = grid.cell(at) else {
                unreachable!("live coords are in bounds");
            };
            for (slot, dir) in Direction::ALL.into_iter().enumerate() {
                let (r, c) = at.ring1(dir);
                assert_eq!(
                    cell.neighbors1()[slot],
                    grid.safe_state_at(r, c),
                    "cached ring at {at} slot {dir:?} must mirror the grid"
                );
            }
        }
    }
}
