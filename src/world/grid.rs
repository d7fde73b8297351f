//! Tile grid and the terrain-fixed registries it owns

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{BridgeId, DebrisId, GridPosition, IdCounter, RuinId, StructureId};
use crate::economy::resources::Resources;
use crate::world::objects::{Bridge, Camp, DebrisKind, DebrisPile, DoorSide, DroppedCargo, RuinBuilding};

/// Terrain of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Ground,
    RuinWall,
    Water,
    Bridge,
    /// Collapsed masonry that blocks movement until cleared
    Rubble,
    /// Ground marked with a demolition charge site
    DemolitionCharge,
}

impl TileKind {
    pub fn is_passable(self) -> bool {
        matches!(self, TileKind::Ground | TileKind::Bridge | TileKind::DemolitionCharge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTile {
    pub kind: TileKind,
    pub structure: Option<StructureId>,
    /// Set while the structure on this tile blocks movement (walls)
    pub structure_blocks: bool,
    pub ruin: Option<RuinId>,
}

impl GridTile {
    fn new(kind: TileKind) -> Self {
        Self {
            kind,
            structure: None,
            structure_blocks: false,
            ruin: None,
        }
    }
}

/// The grid world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMap {
    width: i32,
    height: i32,
    tiles: Vec<GridTile>,
    pub ruins: BTreeMap<RuinId, RuinBuilding>,
    pub bridges: BTreeMap<BridgeId, Bridge>,
    pub debris: BTreeMap<DebrisId, DebrisPile>,
    pub camps: BTreeMap<GridPosition, Camp>,
    pub cargo: BTreeMap<GridPosition, DroppedCargo>,
    ids: IdCounter,
}

impl GameMap {
    pub fn new(width: i32, height: i32) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![GridTile::new(TileKind::Ground); count],
            ruins: BTreeMap::new(),
            bridges: BTreeMap::new(),
            debris: BTreeMap::new(),
            camps: BTreeMap::new(),
            cargo: BTreeMap::new(),
            ids: IdCounter::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: GridPosition) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: GridPosition) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    pub fn tile(&self, cell: GridPosition) -> Option<&GridTile> {
        self.index(cell).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, cell: GridPosition) -> Option<&mut GridTile> {
        self.index(cell).map(move |i| &mut self.tiles[i])
    }

    pub fn tile_kind(&self, cell: GridPosition) -> Option<TileKind> {
        self.tile(cell).map(|t| t.kind)
    }

    /// Change terrain; returns false if the cell is off the map
    pub fn set_tile(&mut self, cell: GridPosition, kind: TileKind) -> bool {
        match self.tile_mut(cell) {
            Some(tile) => {
                tile.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Terrain, blocking structures and blocking debris all considered
    pub fn is_passable(&self, cell: GridPosition) -> bool {
        let Some(tile) = self.tile(cell) else {
            return false;
        };
        if !tile.kind.is_passable() || tile.structure_blocks {
            return false;
        }
        !self.debris_at(cell).map(|d| d.blocks_movement()).unwrap_or(false)
    }

    // ===== STRUCTURE REFERENCES =====

    pub fn structure_at(&self, cell: GridPosition) -> Option<StructureId> {
        self.tile(cell).and_then(|t| t.structure)
    }

    pub fn attach_structure(&mut self, cell: GridPosition, id: StructureId, blocks: bool) {
        if let Some(tile) = self.tile_mut(cell) {
            tile.structure = Some(id);
            tile.structure_blocks = blocks;
        }
    }

    pub fn detach_structure(&mut self, cell: GridPosition, id: StructureId) {
        if let Some(tile) = self.tile_mut(cell) {
            if tile.structure == Some(id) {
                tile.structure = None;
                tile.structure_blocks = false;
            }
        }
    }

    // ===== RUINS =====

    /// Stamp a ruin footprint onto the map
    pub fn add_ruin(&mut self, origin: GridPosition, side: DoorSide, goods: Resources, guards: u32) -> RuinId {
        let id = RuinId(self.ids.next_raw());
        let ruin = RuinBuilding::new(id, origin, side, goods, guards);
        let cells: Vec<GridPosition> = ruin.footprint().collect();
        for cell in cells {
            if let Some(tile) = self.tile_mut(cell) {
                tile.kind = TileKind::RuinWall;
                tile.ruin = Some(id);
            }
        }
        let door = ruin.door;
        if let Some(tile) = self.tile_mut(door) {
            tile.ruin = Some(id);
        }
        self.ruins.insert(id, ruin);
        id
    }

    pub fn ruin_with_door(&self, cell: GridPosition) -> Option<&RuinBuilding> {
        self.ruins.values().find(|r| r.door == cell)
    }

    // ===== BRIDGES =====

    /// Lay a horizontal or vertical bridge between two cells
    pub fn add_bridge(&mut self, from: GridPosition, to: GridPosition) -> Option<BridgeId> {
        let id = BridgeId(self.ids.next_raw());
        let bridge = Bridge::between(id, from, to)?;
        for cell in &bridge.cells {
            self.set_tile(*cell, TileKind::Bridge);
        }
        self.bridges.insert(id, bridge);
        Some(id)
    }

    /// Turn a bridge into water permanently; returns the changed cells
    pub fn destroy_bridge(&mut self, id: BridgeId) -> Vec<GridPosition> {
        let cells = match self.bridges.get_mut(&id) {
            Some(bridge) if !bridge.destroyed => {
                bridge.destroyed = true;
                bridge.cells.clone()
            }
            _ => return Vec::new(),
        };
        for cell in &cells {
            self.set_tile(*cell, TileKind::Water);
        }
        cells
    }

    pub fn functional_bridges(&self) -> impl Iterator<Item = &Bridge> {
        self.bridges.values().filter(|b| b.is_functional())
    }

    /// Bridge that a charge at `cell` would bring down
    pub fn bridge_for_charge(&self, cell: GridPosition, link_radius: u32) -> Option<BridgeId> {
        self.functional_bridges()
            .find(|b| b.distance_to(cell) <= link_radius)
            .or_else(|| self.functional_bridges().next())
            .map(|b| b.id)
    }

    // ===== DEBRIS =====

    pub fn add_debris(&mut self, cell: GridPosition, kind: DebrisKind, goods: Resources) -> DebrisId {
        let id = DebrisId(self.ids.next_raw());
        self.debris.insert(id, DebrisPile { id, cell, kind, goods });
        id
    }

    pub fn debris_at(&self, cell: GridPosition) -> Option<&DebrisPile> {
        self.debris.values().find(|d| d.cell == cell)
    }

    pub fn remove_debris(&mut self, id: DebrisId) -> Option<DebrisPile> {
        self.debris.remove(&id)
    }

    // ===== CAMPS =====

    pub fn camp_at(&self, cell: GridPosition) -> Option<&Camp> {
        self.camps.get(&cell)
    }

    /// Shelter goods at `cell`, merging into an existing camp
    pub fn add_to_camp(&mut self, cell: GridPosition, goods: Resources) {
        self.camps
            .entry(cell)
            .and_modify(|camp| camp.goods.merge(goods))
            .or_insert_with(|| Camp::new(cell, goods));
    }

    pub fn remove_camp(&mut self, cell: GridPosition) -> Option<Camp> {
        self.camps.remove(&cell)
    }

    // ===== DROPPED CARGO =====

    /// Leave goods on the ground, merging into debris or cargo already there
    pub fn drop_cargo(&mut self, cell: GridPosition, wood: u32, bullets: u32) {
        if wood == 0 && bullets == 0 {
            return;
        }
        if let Some(existing) = self.cargo.get_mut(&cell) {
            existing.wood += wood;
            existing.bullets += bullets;
            return;
        }
        if let Some(pile) = self.debris.values_mut().find(|d| d.cell == cell) {
            pile.goods.merge(Resources::cargo(wood, bullets));
            return;
        }
        self.cargo.insert(cell, DroppedCargo { cell, wood, bullets });
    }

    pub fn cargo_at(&self, cell: GridPosition) -> Option<&DroppedCargo> {
        self.cargo.get(&cell)
    }

    // ===== TOTALS =====

    /// Goods held by every terrain-fixed container, ruins excluded
    pub fn loose_goods(&self) -> Resources {
        let mut total = Resources::default();
        for cargo in self.cargo.values() {
            total.merge(cargo.as_resources());
        }
        for camp in self.camps.values() {
            total.merge(camp.goods);
        }
        for pile in self.debris.values() {
            total.merge(pile.goods);
        }
        total
    }
}
