// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use matter_core::policies::Predicate;
use matter_core::{
    BootstrapConfig, Coord, Direction, Engine, EngineBuilder, EngineError, ParticleState,
    ProgressSink, TablePolicy, TableRule,
};

fn engine_with(policy: TablePolicy, cells: &[(&str, u8)]) -> Engine {
    let mut config = BootstrapConfig::new();
    for &(key, number) in cells {
        config = config.with_cell(key, number);
    }
    EngineBuilder::new(Box::new(policy))
        .grid(3, 5)
        .bootstrap(config)
        .build()
        .map_or_else(|_| unreachable!("fixture engine must build"), |e| e)
}

fn run_rounds(engine: &mut Engine, rounds: usize) {
    engine.start();
    for _ in 0..rounds * 4 {
        if engine.tick().is_err() {
            unreachable!("fixture ticks must succeed");
        }
    }
}

#[test]
fn s1_single_contracted_particle_moves_right() {
    let policy = TablePolicy::synchronous().with_fallback(ParticleState::MoveR);
    let mut engine = engine_with(policy, &[("1,1", 1)]);
    run_rounds(&mut engine, 1);

    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 2), ParticleState::Contracted);
    assert_eq!(grid.safe_state_at(1, 1), ParticleState::Void);
}

#[test]
fn s2_move_blocked_by_neighbor() {
    // Charge an occupied right neighbor; hold otherwise. The left particle
    // attempts the move and fails; the right particle rests.
    let policy = TablePolicy::synchronous()
        .with_rule(TableRule::when(
            [
                Predicate::StateIs(ParticleState::Contracted),
                Predicate::Neighbor1Is(Direction::R, ParticleState::Contracted),
            ],
            ParticleState::MoveR,
        ))
        .with_rule(TableRule::always(ParticleState::Contracted));
    let mut engine = engine_with(policy, &[("1,1", 1), ("1,2", 1)]);
    run_rounds(&mut engine, 1);

    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 1), ParticleState::Contracted);
    assert_eq!(grid.safe_state_at(1, 2), ParticleState::Contracted);
    let Some(left) = grid.cell(Coord::new(1, 1)) else {
        unreachable!("in bounds");
    };
    assert!(left.move_failed(), "the rejected move must be recorded");
    let Some(right) = grid.cell(Coord::new(1, 2)) else {
        unreachable!("in bounds");
    };
    assert!(!right.move_failed());
}

#[test]
fn s3_expand_then_contract() {
    let policy = TablePolicy::synchronous()
        .with_rule(TableRule::when(
            [Predicate::StateIs(ParticleState::Contracted)],
            ParticleState::ExpandR,
        ))
        .with_rule(TableRule::when(
            [Predicate::StateIs(ParticleState::ExpandR)],
            ParticleState::Contracted,
        ));
    let mut engine = engine_with(policy, &[("1,1", 1)]);

    run_rounds(&mut engine, 1);
    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 1), ParticleState::ExpandR);

    run_rounds(&mut engine, 1);
    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 1), ParticleState::Contracted);
    let Some(particle) = grid.cell(Coord::new(1, 1)) else {
        unreachable!("in bounds");
    };
    assert_eq!(particle.round(), 2);
}

#[test]
fn s4_obstacle_blocks_move() {
    let policy = TablePolicy::synchronous().with_fallback(ParticleState::MoveR);
    let mut engine = engine_with(policy, &[("1,1", 1), ("1,2", 14)]);
    run_rounds(&mut engine, 1);

    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 1), ParticleState::Contracted);
    assert_eq!(grid.safe_state_at(1, 2), ParticleState::Obstacle);
    let Some(blocked) = grid.cell(Coord::new(1, 1)) else {
        unreachable!("in bounds");
    };
    assert!(blocked.move_failed());
}

#[test]
fn s6_round_counter_reaches_k_after_k_rounds() {
    #[derive(Default)]
    struct Latest(AtomicU64);
    impl ProgressSink for Latest {
        fn on_round(&self, round: u64) {
            self.0.store(round, Ordering::SeqCst);
        }
    }

    let sink = Arc::new(Latest::default());
    let mut config = BootstrapConfig::new();
    for key in ["1,1", "1,2", "1,3"] {
        config = config.with_cell(key, 1);
    }
    let Ok(mut engine) = EngineBuilder::new(Box::new(TablePolicy::synchronous()))
        .grid(3, 5)
        .bootstrap(config)
        .progress(sink.clone())
        .build()
    else {
        unreachable!("fixture engine must build");
    };

    const K: u64 = 5;
    engine.start();
    for _ in 0..K * 4 {
        let Ok(()) = engine.tick() else {
            unreachable!("tick must succeed");
        };
    }
    assert_eq!(engine.current_round(), K);
    assert_eq!(sink.0.load(Ordering::SeqCst), K, "sink sees the round counter");
}

#[test]
fn cell_exclusivity_holds_across_rounds() {
    // march-right: live count is invariant while particles only move.
    let policy = TablePolicy::synchronous()
        .with_rule(TableRule::when(
            [
                Predicate::StateIs(ParticleState::Contracted),
                Predicate::Neighbor1Is(Direction::R, ParticleState::Void),
            ],
            ParticleState::MoveR,
        ))
        .with_rule(TableRule::always(ParticleState::Contracted));
    let mut engine = engine_with(policy, &[("1,1", 1), ("1,2", 1)]);
    let before = engine.live_count();
    run_rounds(&mut engine, 3);
    assert_eq!(engine.live_count(), before);
}

#[test]
fn particles_vanish_only_when_policy_returns_void() {
    let policy = TablePolicy::synchronous().with_fallback(ParticleState::Void);
    let mut engine = engine_with(policy, &[("1,1", 1), ("1,3", 1)]);
    assert_eq!(engine.live_count(), 2);
    run_rounds(&mut engine, 1);
    assert_eq!(engine.live_count(), 0, "a VOID action vacates the cell");
}

#[test]
fn round_monotonicity_for_resting_particles() {
    let mut engine = engine_with(
        TablePolicy::synchronous(),
        &[("1,1", 1), ("1,2", 1), ("1,3", 1)],
    );
    let mut last = vec![0u64; 3];
    engine.start();
    for round in 1..=4u64 {
        for _ in 0..4 {
            let Ok(()) = engine.tick() else {
                unreachable!("tick must succeed");
            };
        }
        let grid = engine.snapshot();
        for (i, col) in [1usize, 2, 3].into_iter().enumerate() {
            let Some(cell) = grid.cell(Coord::new(1, col)) else {
                unreachable!("in bounds");
            };
            assert_eq!(cell.round(), round, "rounds advance by exactly one");
            assert!(cell.round() >= last[i]);
            last[i] = cell.round();
        }
    }
}

#[test]
fn obstacles_survive_every_round() {
    let policy = TablePolicy::synchronous().with_fallback(ParticleState::MoveR);
    let mut engine = engine_with(policy, &[("1,1", 1), ("1,3", 14)]);
    run_rounds(&mut engine, 4);
    let grid = engine.snapshot();
    assert_eq!(grid.safe_state_at(1, 3), ParticleState::Obstacle);
}

#[test]
fn neighbor_caches_mirror_grid_after_look() {
    let mut engine = engine_with(
        TablePolicy::synchronous(),
        &[("1,1", 1), ("1,2", 3), ("1,3", 1)],
    );
    engine.start();
    // Two ticks: SCHEDULER then LOOK.
    for _ in 0..2 {
        let Ok(()) = engine.tick() else {
            unreachable!("tick must succeed");
        };
    }
    let grid = engine.snapshot();
    for at in grid.live_coords().collect::<Vec<_>>() {
        let Some(cell) = grid.cell(at) else {
            unreachable!("live coords in bounds");
        };
        for (slot, dir) in Direction::ALL.into_iter().enumerate() {
            let (r, c) = at.ring1(dir);
            assert_eq!(
                cell.neighbors1()[slot],
                grid.safe_state_at(r, c),
                "post-LOOK cache at {at} slot {dir:?} must mirror the grid"
            );
        }
    }
}

#[test]
fn unknown_action_name_is_fatal() {
    struct Gibberish;
    impl matter_core::Policy for Gibberish {
        fn scheduler(
            &mut self,
            input: &matter_core::SchedulerInput,
        ) -> Result<matter_core::SchedulerDecision, matter_core::PolicyError> {
            Ok(matter_core::SchedulerDecision {
                active_particles: input.particles.clone(),
                ..Default::default()
            })
        }
        fn particle(
            &mut self,
            _input: &matter_core::ParticleInputs,
        ) -> Result<String, matter_core::PolicyError> {
            Ok("WIGGLE".to_owned())
        }
    }

    let Ok(mut engine) = EngineBuilder::new(Box::new(Gibberish))
        .grid(3, 5)
        .bootstrap(BootstrapConfig::new().with_cell("1,1", 1))
        .build()
    else {
        unreachable!("fixture engine must build");
    };
    engine.start();
    // SCHEDULER and LOOK pass; COMPUTE rejects the action name.
    let mut failed = None;
    for _ in 0..4 {
        if let Err(err) = engine.tick() {
            failed = Some(err);
            break;
        }
    }
    assert!(
        matches!(
            failed,
            Some(EngineError::Policy(matter_core::PolicyError::UnknownAction(ref name)))
                if name == "WIGGLE"
        ),
        "unrecognized result names are fatal, got {failed:?}"
    );
    assert!(!engine.is_running());
}
