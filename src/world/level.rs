//! Scenario builders
//!
//! A level is terrain plus the seed structures and hostiles that the
//! simulation installs when it starts.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::BalanceConfig;
use crate::core::types::GridPosition;
use crate::economy::resources::{Quotas, Resources};
use crate::world::grid::{GameMap, TileKind};
use crate::world::objects::{DebrisKind, DoorSide};

/// Which scenario to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    /// Full siege level with a starting base
    Standard,
    /// Standard terrain with no starting structures
    EmptyTester,
    /// Featureless ground, used by tests
    Blank,
}

impl LevelKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(LevelKind::Standard),
            "empty" | "tester" | "empty-tester" => Some(LevelKind::EmptyTester),
            "blank" => Some(LevelKind::Blank),
            _ => None,
        }
    }
}

/// A pre-stocked depot installed at start
#[derive(Debug, Clone, PartialEq)]
pub struct DepotSeed {
    pub cell: GridPosition,
    pub stock: Resources,
    pub quotas: Quotas,
}

/// A pre-built outpost installed at start
#[derive(Debug, Clone, PartialEq)]
pub struct OutpostSeed {
    pub cell: GridPosition,
    pub present: Resources,
}

/// Terrain plus initial population
#[derive(Debug, Clone)]
pub struct Level {
    pub map: GameMap,
    pub depots: Vec<DepotSeed>,
    pub outposts: Vec<OutpostSeed>,
    pub hostiles: Vec<GridPosition>,
}

impl Level {
    pub fn build<R: Rng + ?Sized>(kind: LevelKind, config: &BalanceConfig, rng: &mut R) -> Self {
        match kind {
            LevelKind::Standard => standard_level(config, rng),
            LevelKind::EmptyTester => empty_tester_level(config, rng),
            LevelKind::Blank => Self::blank(config),
        }
    }

    pub fn blank(config: &BalanceConfig) -> Self {
        Self {
            map: GameMap::new(config.map_width, config.map_height),
            depots: Vec::new(),
            outposts: Vec::new(),
            hostiles: Vec::new(),
        }
    }
}

const SOUTH_EAST_HOSTILES: [(i32, i32); 8] = [
    (50, 15),
    (52, 17),
    (54, 15),
    (56, 17),
    (50, 20),
    (52, 22),
    (54, 20),
    (56, 22),
];

/// Terrain shared by the standard and tester levels
fn siege_terrain<R: Rng + ?Sized>(config: &BalanceConfig, rng: &mut R) -> GameMap {
    let mut map = GameMap::new(config.map_width, config.map_height);
    let bridge_x = map.width() / 2 - 1;

    // Two rivers, one bridge each, a charge site on the home bank
    for (river, charge_y) in [((58, 59), 57), ((4, 5), 6)] {
        for x in 0..map.width() {
            map.set_tile(GridPosition::new(x, river.0), TileKind::Water);
            map.set_tile(GridPosition::new(x, river.1), TileKind::Water);
        }
        map.add_bridge(GridPosition::new(bridge_x, river.0), GridPosition::new(bridge_x, river.1));
        map.set_tile(GridPosition::new(bridge_x - 1, charge_y), TileKind::DemolitionCharge);
    }

    for (x, y, kind) in [
        (25, 30, DebrisKind::Car),
        (26, 30, DebrisKind::Dumpster),
        (38, 32, DebrisKind::Recycling),
        (39, 32, DebrisKind::CardboardBox),
    ] {
        let goods = kind.roll_goods(rng);
        map.add_debris(GridPosition::new(x, y), kind, goods);
    }

    for (x, y) in [(20, 36), (21, 36), (42, 27)] {
        map.set_tile(GridPosition::new(x, y), TileKind::Rubble);
    }

    // North-east ruins: unguarded, rich
    for (x, y) in [(45, 45), (50, 45), (45, 50), (50, 50), (55, 45), (55, 50), (45, 38), (50, 38)] {
        let goods = Resources::new(rng.gen_range(1..=40), rng.gen_range(1..=40), rng.gen_range(1..=40));
        map.add_ruin(GridPosition::new(x, y), DoorSide::South, goods, 0);
    }

    // South-west ruins: guarded
    for (x, y) in [(8, 10), (8, 15), (8, 20), (8, 25), (14, 10), (14, 15), (14, 20), (14, 25)] {
        let guards = rng.gen_range(1..=3);
        let goods = Resources::new(rng.gen_range(0..=5), rng.gen_range(10..=30), rng.gen_range(10..=30));
        map.add_ruin(GridPosition::new(x, y), DoorSide::East, goods, guards);
    }

    // North-west stronghold
    map.add_ruin(GridPosition::new(10, 50), DoorSide::South, Resources::new(10, 50, 50), 3);

    map
}

/// The standard siege level
pub fn standard_level<R: Rng + ?Sized>(config: &BalanceConfig, rng: &mut R) -> Level {
    let map = siege_terrain(config, rng);
    let cx = map.width() / 2;
    let cy = map.height() / 2;

    let depot = DepotSeed {
        cell: GridPosition::new(cx - 1, cy - 1),
        stock: Resources::new(24, 100, 500),
        quotas: Quotas::new(24, 0, 0),
    };
    let outposts = [GridPosition::new(cx - 5, cy), GridPosition::new(cx + 4, cy)]
        .into_iter()
        .map(|cell| OutpostSeed { cell, present: Resources::new(5, 0, 50) })
        .collect();

    Level {
        map,
        depots: vec![depot],
        outposts,
        hostiles: SOUTH_EAST_HOSTILES.iter().map(|&(x, y)| GridPosition::new(x, y)).collect(),
    }
}

/// Standard terrain without a starting base
pub fn empty_tester_level<R: Rng + ?Sized>(config: &BalanceConfig, rng: &mut R) -> Level {
    Level {
        map: siege_terrain(config, rng),
        depots: Vec::new(),
        outposts: Vec::new(),
        hostiles: SOUTH_EAST_HOSTILES.iter().map(|&(x, y)| GridPosition::new(x, y)).collect(),
    }
}
