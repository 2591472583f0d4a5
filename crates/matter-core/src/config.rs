// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bootstrap configuration: the document an initial policy hands the
//! engine before the first tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default per-phase delay maximum in milliseconds.
pub const DEFAULT_PHASE_MAX_MS: u64 = 1000;

/// Default hex size in pixels.
pub const DEFAULT_HEX_SIZE: u32 = 16;

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 800;

/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 600;

fn default_phase_ms() -> u64 {
    DEFAULT_PHASE_MAX_MS
}

fn default_hex_size() -> u32 {
    DEFAULT_HEX_SIZE
}

/// Upper bounds for the async pipeline's uniformly random phase delays.
///
/// The randomized delays model asynchronous hardware with unknown timing;
/// zeroing them makes the async pipeline complete as fast as the runtime
/// can schedule it, which is what tests want.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMaxima {
    /// Maximum delay before a worker wakes its particle.
    #[serde(rename = "particle_phase_wakeup", default = "default_phase_ms")]
    pub wakeup_ms: u64,
    /// Maximum delay between LOOK and COMPUTE.
    #[serde(rename = "particle_phase_look", default = "default_phase_ms")]
    pub look_ms: u64,
    /// Maximum delay between COMPUTE and stamping the chosen action.
    #[serde(rename = "particle_phase_compute", default = "default_phase_ms")]
    pub compute_ms: u64,
    /// Maximum delay before the worker enqueues its result.
    #[serde(rename = "particle_phase_move", default = "default_phase_ms")]
    pub move_ms: u64,
}

impl Default for PhaseMaxima {
    fn default() -> Self {
        Self {
            wakeup_ms: DEFAULT_PHASE_MAX_MS,
            look_ms: DEFAULT_PHASE_MAX_MS,
            compute_ms: DEFAULT_PHASE_MAX_MS,
            move_ms: DEFAULT_PHASE_MAX_MS,
        }
    }
}

impl PhaseMaxima {
    /// All four maxima zero: no artificial delays.
    pub fn zero() -> Self {
        Self {
            wakeup_ms: 0,
            look_ms: 0,
            compute_ms: 0,
            move_ms: 0,
        }
    }
}

/// The bootstrap document.
///
/// `init_state` keys are `"row,col"` coordinate strings and values are
/// boundary state numbers (0..=14).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Hex size in pixels; drives viewport-derived grid shapes.
    #[serde(default = "default_hex_size")]
    pub hex_size: u32,
    /// Seed cells: coordinate string to state number.
    #[serde(default)]
    pub init_state: BTreeMap<String, u8>,
    /// Async phase delay maxima.
    #[serde(flatten)]
    pub phase_maxima: PhaseMaxima,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapConfig {
    /// An empty bootstrap with default hex size and phase maxima.
    pub fn new() -> Self {
        Self {
            hex_size: DEFAULT_HEX_SIZE,
            init_state: BTreeMap::new(),
            phase_maxima: PhaseMaxima::default(),
        }
    }

    /// Adds one seed cell.
    #[must_use]
    pub fn with_cell(mut self, key: impl Into<String>, state_number: u8) -> Self {
        self.init_state.insert(key.into(), state_number);
        self
    }

    /// Replaces the phase maxima.
    #[must_use]
    pub fn with_phase_maxima(mut self, maxima: PhaseMaxima) -> Self {
        self.phase_maxima = maxima;
        self
    }
}
