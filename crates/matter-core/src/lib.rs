// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! matter-core: hex-grid programmable-matter simulation engine.
//!
//! A population of autonomous particles lives on a shared hex grid and
//! evolves in rounds. A user-supplied scheduler policy picks which
//! particles wake each round; each awakened particle observes its local
//! neighborhood and a user-supplied transition policy chooses its next
//! action; the move resolver applies actions while preserving the physical
//! invariants (one particle per cell, movement only into empty cells,
//! immovable obstacles).
//!
//! Rounds run under one of two disciplines, chosen by the scheduler
//! policy: the synchronous four-phase machine
//! (SCHEDULER -> LOOK -> COMPUTE -> MOVE, one phase per tick) or the
//! asynchronous fiber-per-particle pipeline with randomized phase delays.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

mod config;
mod engine_impl;
mod grid;
mod particle;
/// Built-in policy adapters and the named-policy shelf.
pub mod policies;
mod policy;
/// Neighborhood observation: single-cell probes and the bulk LOOK pass.
pub mod probe;
mod resolver;
mod round_async;
mod round_sync;
mod state;
mod telemetry;

// Re-exports for stable public API
/// Bootstrap document and its defaults.
pub use config::{
    BootstrapConfig, PhaseMaxima, DEFAULT_HEX_SIZE, DEFAULT_PHASE_MAX_MS,
    DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
/// The engine, its builder, and the tick-time error taxonomy.
pub use engine_impl::{Engine, EngineBuilder, EngineError};
/// Hex container, coordinates, and viewport-derived shapes.
pub use grid::{Coord, GridError, GridGeometry, HexGrid};
/// Per-cell particle record and its checked mutations.
pub use particle::{Particle, ParticleError, MAX_DEGREE};
/// Commonly used built-in adapters, re-exported flat.
pub use policies::{builtin_shelf, PolicyShelf, TablePolicy, TableRule};
/// The policy seam: trait, marshaled inputs and outputs, and the bridge.
pub use policy::{
    ParticleInputs, Policy, PolicyBridge, PolicyError, RoundDiscipline, SchedulerDecision,
    SchedulerInput,
};
/// Synchronous round phases, visible for drivers that pace by phase.
pub use round_sync::SyncPhase;
/// State tags, inner state, directions, and the boundary codec.
pub use state::{Direction, InnerState, ParticleState, StateError};
/// Progress reporting seam.
pub use telemetry::{NullProgressSink, ProgressSink};
