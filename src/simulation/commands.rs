//! Player intents fed into the simulation between ticks

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPosition, StructureId};
use crate::economy::depot::{FlowDirection, PrioritizationMode};
use crate::economy::resources::ResourceKind;
use crate::economy::structure::StructureType;

/// Time-speed multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeSpeed {
    Paused,
    #[default]
    Normal,
    Double,
    Quadruple,
    Ten,
}

impl TimeSpeed {
    pub fn multiplier(self) -> f32 {
        match self {
            TimeSpeed::Paused => 0.0,
            TimeSpeed::Normal => 1.0,
            TimeSpeed::Double => 2.0,
            TimeSpeed::Quadruple => 4.0,
            TimeSpeed::Ten => 10.0,
        }
    }

    /// Next speed in the 1× → 2× → 4× → 10× → 1× cycle
    pub fn cycle(self) -> Self {
        match self {
            TimeSpeed::Paused | TimeSpeed::Ten => TimeSpeed::Normal,
            TimeSpeed::Normal => TimeSpeed::Double,
            TimeSpeed::Double => TimeSpeed::Quadruple,
            TimeSpeed::Quadruple => TimeSpeed::Ten,
        }
    }

    pub fn from_multiplier(value: u32) -> Option<Self> {
        match value {
            0 => Some(TimeSpeed::Paused),
            1 => Some(TimeSpeed::Normal),
            2 => Some(TimeSpeed::Double),
            4 => Some(TimeSpeed::Quadruple),
            10 => Some(TimeSpeed::Ten),
            _ => None,
        }
    }
}

/// Presentation overlays; toggling one has no effect on the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    ServiceRadius,
    Dependencies,
    NoiseRadius,
}

/// Changes to a depot's prioritization list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrioritizationChange {
    Add {
        target: StructureId,
        mode: PrioritizationMode,
        flow_percent: u32,
        direction: FlowDirection,
    },
    RemoveLast,
    Clear,
}

/// Commands that can be issued to the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Build a structure on a cell
    PlaceStructure { structure: StructureType, cell: GridPosition },
    /// Raise or lower a quota; the result never goes below zero
    AdjustQuota { id: StructureId, resource: ResourceKind, delta: i64 },
    /// Empty a structure and remove it
    Retreat { id: StructureId },
    SetTimeSpeed { speed: TimeSpeed },
    ToggleOverlay { overlay: OverlayKind },
    /// Queue an outpost range upgrade
    UpgradeOutpost { id: StructureId },
    SetHoldFire { id: StructureId, hold: bool },
    /// Spend a bullet into the air to draw hostiles
    WarningShot { id: StructureId },
    Prioritize { depot: StructureId, change: PrioritizationChange },
}

/// Outcome of a successfully applied command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Placed(StructureId),
}
