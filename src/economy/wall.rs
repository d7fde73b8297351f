//! Wall: passive blocker whose health is the wood it holds

use serde::{Deserialize, Serialize};

use crate::economy::resources::{ResourceKind, Resources};

/// Wall payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wall {
    /// A wall that never received wood is still under construction
    pub ever_stocked: bool,
}

impl Wall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(present: &Resources) -> u32 {
        present.wood
    }

    /// Knock wood off the wall; returns remaining health
    pub fn take_damage(present: &mut Resources, amount: u32) -> u32 {
        present.take(ResourceKind::Wood, amount);
        present.wood
    }
}
