//! Terrain-fixed world objects: ruins, bridges, debris, camps and dropped cargo

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{BridgeId, DebrisId, GridPosition, RuinId, StructureId};
use crate::economy::resources::Resources;

/// Footprint width of a ruin building
pub const RUIN_WIDTH: i32 = 2;
/// Footprint height of a ruin building
pub const RUIN_HEIGHT: i32 = 3;

/// Which side of the footprint the door opens onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorSide {
    North,
    East,
    South,
    West,
}

impl DoorSide {
    /// Door cell for a footprint whose lower-left corner is `origin`
    pub fn door_cell(self, origin: GridPosition) -> GridPosition {
        match self {
            DoorSide::South => origin.offset(0, -1),
            DoorSide::North => origin.offset(0, RUIN_HEIGHT),
            DoorSide::West => origin.offset(-1, 1),
            DoorSide::East => origin.offset(RUIN_WIDTH, 1),
        }
    }
}

/// A 2x3 city ruin with guarded loot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuinBuilding {
    pub id: RuinId,
    /// Lower-left footprint cell
    pub origin: GridPosition,
    pub door: GridPosition,
    pub goods: Resources,
    /// Hostiles still sheltering inside
    pub guards: u32,
    /// Workshop currently bound to the door
    pub workshop: Option<StructureId>,
}

impl RuinBuilding {
    pub fn new(id: RuinId, origin: GridPosition, side: DoorSide, goods: Resources, guards: u32) -> Self {
        Self {
            id,
            origin,
            door: side.door_cell(origin),
            goods,
            guards,
            workshop: None,
        }
    }

    pub fn footprint(&self) -> impl Iterator<Item = GridPosition> + '_ {
        (0..RUIN_HEIGHT).flat_map(move |dy| (0..RUIN_WIDTH).map(move |dx| self.origin.offset(dx, dy)))
    }

    pub fn occupies(&self, cell: GridPosition) -> bool {
        cell.x >= self.origin.x
            && cell.x < self.origin.x + RUIN_WIDTH
            && cell.y >= self.origin.y
            && cell.y < self.origin.y + RUIN_HEIGHT
    }

    /// Closest footprint tile distance to `cell`
    pub fn distance_to(&self, cell: GridPosition) -> u32 {
        self.footprint().map(|t| t.manhattan(&cell)).min().unwrap_or(u32::MAX)
    }

    pub fn has_goods(&self) -> bool {
        !self.goods.is_empty()
    }

    /// Guards stay inside while looting goes on; only noise draws them out
    pub fn can_be_harvested(&self) -> bool {
        self.has_goods()
    }

    /// Emptied and unguarded
    pub fn is_inert(&self) -> bool {
        self.guards == 0 && !self.has_goods()
    }
}

/// A straight run of bridge cells over water
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub id: BridgeId,
    pub cells: Vec<GridPosition>,
    pub destroyed: bool,
}

impl Bridge {
    /// Build the run between two cells sharing a row or column
    pub fn between(id: BridgeId, from: GridPosition, to: GridPosition) -> Option<Self> {
        let cells: Vec<GridPosition> = if from.y == to.y {
            let (lo, hi) = (from.x.min(to.x), from.x.max(to.x));
            (lo..=hi).map(|x| GridPosition::new(x, from.y)).collect()
        } else if from.x == to.x {
            let (lo, hi) = (from.y.min(to.y), from.y.max(to.y));
            (lo..=hi).map(|y| GridPosition::new(from.x, y)).collect()
        } else {
            return None;
        };
        Some(Self { id, cells, destroyed: false })
    }

    pub fn is_functional(&self) -> bool {
        !self.destroyed
    }

    pub fn first_cell(&self) -> Option<GridPosition> {
        self.cells.first().copied()
    }

    pub fn distance_to(&self, cell: GridPosition) -> u32 {
        self.cells.iter().map(|c| c.manhattan(&cell)).min().unwrap_or(u32::MAX)
    }
}

/// Wood and bullets left on the ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedCargo {
    pub cell: GridPosition,
    pub wood: u32,
    pub bullets: u32,
}

impl DroppedCargo {
    pub fn is_empty(&self) -> bool {
        self.wood == 0 && self.bullets == 0
    }

    pub fn as_resources(&self) -> Resources {
        Resources::cargo(self.wood, self.bullets)
    }
}

/// Improvised shelter made by a stranded unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camp {
    pub cell: GridPosition,
    pub goods: Resources,
    /// Seconds accumulated toward the next ambient noise roll
    pub noise_timer: f32,
}

impl Camp {
    pub fn new(cell: GridPosition, goods: Resources) -> Self {
        Self { cell, goods, noise_timer: 0.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.goods.is_empty()
    }

    /// Chance that this camp makes noise on a roll
    pub fn noise_chance(&self, base: f64, per_survivor: f64, max: f64) -> f64 {
        (base + per_survivor * self.goods.survivors as f64).min(max)
    }
}

/// Kinds of scavengeable urban clutter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebrisKind {
    Car,
    Dumpster,
    Recycling,
    CardboardBox,
}

impl DebrisKind {
    pub fn blocks_movement(self) -> bool {
        matches!(self, DebrisKind::Car | DebrisKind::Dumpster)
    }

    pub fn name(self) -> &'static str {
        match self {
            DebrisKind::Car => "Car",
            DebrisKind::Dumpster => "Dumpster",
            DebrisKind::Recycling => "Recycling Bin",
            DebrisKind::CardboardBox => "Cardboard Box",
        }
    }

    fn survivor_range(self) -> (u32, u32) {
        match self {
            DebrisKind::Car => (0, 4),
            DebrisKind::Dumpster => (0, 2),
            DebrisKind::Recycling | DebrisKind::CardboardBox => (0, 0),
        }
    }

    /// Wood and bullets share the same range per kind
    fn goods_range(self) -> (u32, u32) {
        match self {
            DebrisKind::Car => (30, 50),
            DebrisKind::Dumpster => (20, 40),
            DebrisKind::Recycling => (10, 30),
            DebrisKind::CardboardBox => (0, 20),
        }
    }

    /// Roll a fresh loot table for this kind
    pub fn roll_goods<R: Rng + ?Sized>(self, rng: &mut R) -> Resources {
        let (s_lo, s_hi) = self.survivor_range();
        let (g_lo, g_hi) = self.goods_range();
        Resources::new(
            rng.gen_range(s_lo..=s_hi),
            rng.gen_range(g_lo..=g_hi),
            rng.gen_range(g_lo..=g_hi),
        )
    }
}

/// A scavengeable pile on a single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebrisPile {
    pub id: DebrisId,
    pub cell: GridPosition,
    pub kind: DebrisKind,
    pub goods: Resources,
}

impl DebrisPile {
    pub fn blocks_movement(&self) -> bool {
        self.kind.blocks_movement()
    }

    pub fn has_goods(&self) -> bool {
        !self.goods.is_empty()
    }
}
