//! Noise levels and their propagation parameters
//!
//! Propagation itself lives on `Simulation::emit_noise` since it touches
//! the ruin registry and every hostile.

use serde::{Deserialize, Serialize};

/// How loud an event is. Ordered: louder levels compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum NoiseLevel {
    #[default]
    None,
    /// Units on the move
    Low,
    /// Harvesting, camps
    Medium,
    /// Gunfire, explosions
    High,
}

impl NoiseLevel {
    /// Manhattan radius the noise carries
    pub fn radius(self) -> u32 {
        match self {
            NoiseLevel::None => 0,
            NoiseLevel::Low => 2,
            NoiseLevel::Medium => 4,
            NoiseLevel::High => 8,
        }
    }

    /// Chance that a guarded ruin in range releases one guard
    pub fn trigger_chance(self) -> f64 {
        match self {
            NoiseLevel::None => 0.0,
            NoiseLevel::Low => 0.2,
            NoiseLevel::Medium => 0.4,
            NoiseLevel::High => 1.0,
        }
    }
}
