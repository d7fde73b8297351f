//! Dry-run placement validation
//!
//! Used by the presentation layer for previews and by the simulation
//! before committing a placement. Never mutates state.

use serde::{Deserialize, Serialize};

use crate::core::types::GridPosition;
use crate::economy::structure::StructureType;
use crate::economy::workshop::WorkshopTarget;
use crate::world::grid::{GameMap, TileKind};

/// Result of validating a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementOutcome {
    Ok,
    OutOfRange,
    InvalidLocation,
    NothingToScavenge,
    AlreadyHasWorkshop,
}

impl PlacementOutcome {
    pub fn is_ok(self) -> bool {
        self == PlacementOutcome::Ok
    }
}

/// What a workshop placed on `cell` would harvest
pub fn workshop_target_at(
    map: &GameMap,
    cell: GridPosition,
    link_radius: u32,
) -> Result<WorkshopTarget, PlacementOutcome> {
    let Some(tile) = map.tile(cell) else {
        return Err(PlacementOutcome::InvalidLocation);
    };
    if matches!(tile.kind, TileKind::Water | TileKind::RuinWall) {
        return Err(PlacementOutcome::InvalidLocation);
    }
    // A stripped ruin's door falls through to whatever was dropped on it
    let ruin = map
        .ruin_with_door(cell)
        .filter(|r| r.can_be_harvested() || map.cargo_at(cell).is_none());
    if let Some(ruin) = ruin {
        if ruin.workshop.is_some() {
            return Err(PlacementOutcome::AlreadyHasWorkshop);
        }
        if tile.structure.is_some() {
            return Err(PlacementOutcome::InvalidLocation);
        }
        return Ok(WorkshopTarget::Ruin(ruin.id));
    }
    if tile.structure.is_some() {
        return Err(PlacementOutcome::InvalidLocation);
    }
    if let Some(pile) = map.debris_at(cell) {
        return Ok(WorkshopTarget::Debris(pile.id));
    }
    match tile.kind {
        TileKind::Rubble => return Ok(WorkshopTarget::Rubble),
        TileKind::DemolitionCharge => {
            return Ok(WorkshopTarget::Demolition {
                bridge: map.bridge_for_charge(cell, link_radius),
            })
        }
        _ => {}
    }
    if map.camp_at(cell).is_some() {
        return Ok(WorkshopTarget::Camp(cell));
    }
    if map.cargo_at(cell).is_some() {
        return Ok(WorkshopTarget::Cargo(cell));
    }
    Err(PlacementOutcome::NothingToScavenge)
}

/// Bare ground free of every structure and terrain-fixed object
pub fn is_buildable_ground(map: &GameMap, cell: GridPosition) -> bool {
    let Some(tile) = map.tile(cell) else {
        return false;
    };
    tile.kind == TileKind::Ground
        && tile.structure.is_none()
        && tile.ruin.is_none()
        && map.debris_at(cell).is_none()
        && map.camp_at(cell).is_none()
        && map.cargo_at(cell).is_none()
}

/// Validate placing `kind` on `cell` given the live depot cells
pub fn validate_placement(
    map: &GameMap,
    kind: StructureType,
    cell: GridPosition,
    live_depots: &[GridPosition],
    service_radius: u32,
    link_radius: u32,
) -> PlacementOutcome {
    if !map.in_bounds(cell) {
        return PlacementOutcome::InvalidLocation;
    }

    if kind == StructureType::Workshop {
        if let Err(outcome) = workshop_target_at(map, cell, link_radius) {
            return outcome;
        }
    } else if !is_buildable_ground(map, cell) {
        return PlacementOutcome::InvalidLocation;
    }

    let in_range = live_depots.iter().any(|d| d.within_radius(&cell, service_radius));
    match kind {
        // The very first depot may go anywhere; later ones must join the network
        StructureType::Depot if live_depots.is_empty() || in_range => PlacementOutcome::Ok,
        _ if in_range => PlacementOutcome::Ok,
        _ => PlacementOutcome::OutOfRange,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::resources::Resources;
    use crate::world::objects::{DebrisKind, DoorSide};

    fn depots() -> Vec<GridPosition> {
        vec![GridPosition::new(10, 10)]
    }

    #[test]
    fn test_first_depot_anywhere() {
        let map = GameMap::new(32, 32);
        let outcome = validate_placement(&map, StructureType::Depot, GridPosition::new(30, 30), &[], 8, 2);
        assert_eq!(outcome, PlacementOutcome::Ok);
    }

    #[test]
    fn test_non_depot_needs_a_depot() {
        let map = GameMap::new(32, 32);
        let outcome = validate_placement(&map, StructureType::Outpost, GridPosition::new(3, 3), &[], 8, 2);
        assert_eq!(outcome, PlacementOutcome::OutOfRange);
    }

    #[test]
    fn test_service_radius_is_manhattan() {
        let map = GameMap::new(32, 32);
        let inside = validate_placement(&map, StructureType::Wall, GridPosition::new(14, 14), &depots(), 8, 2);
        let outside = validate_placement(&map, StructureType::Wall, GridPosition::new(15, 14), &depots(), 8, 2);
        assert_eq!(inside, PlacementOutcome::Ok);
        assert_eq!(outside, PlacementOutcome::OutOfRange);
        let far_depot = validate_placement(&map, StructureType::Depot, GridPosition::new(20, 20), &depots(), 8, 2);
        assert_eq!(far_depot, PlacementOutcome::OutOfRange);
    }

    #[test]
    fn test_water_is_invalid() {
        let mut map = GameMap::new(32, 32);
        map.set_tile(GridPosition::new(11, 10), TileKind::Water);
        for kind in [StructureType::Depot, StructureType::Workshop, StructureType::Wall] {
            let outcome = validate_placement(&map, kind, GridPosition::new(11, 10), &depots(), 8, 2);
            assert_eq!(outcome, PlacementOutcome::InvalidLocation);
        }
    }

    #[test]
    fn test_workshop_needs_something_to_scavenge() {
        let map = GameMap::new(32, 32);
        let outcome = validate_placement(&map, StructureType::Workshop, GridPosition::new(11, 10), &depots(), 8, 2);
        assert_eq!(outcome, PlacementOutcome::NothingToScavenge);
    }

    #[test]
    fn test_workshop_on_ruin_door() {
        let mut map = GameMap::new(32, 32);
        let ruin = map.add_ruin(GridPosition::new(12, 8), DoorSide::West, Resources::new(0, 20, 0), 0);
        let door = map.ruins[&ruin].door;
        assert_eq!(
            validate_placement(&map, StructureType::Workshop, door, &depots(), 8, 2),
            PlacementOutcome::Ok
        );
        assert_eq!(
            validate_placement(&map, StructureType::Outpost, door, &depots(), 8, 2),
            PlacementOutcome::InvalidLocation
        );
        map.ruins.get_mut(&ruin).unwrap().workshop = Some(crate::core::types::StructureId(9));
        assert_eq!(
            validate_placement(&map, StructureType::Workshop, door, &depots(), 8, 2),
            PlacementOutcome::AlreadyHasWorkshop
        );
    }

    #[test]
    fn test_workshop_targets() {
        let mut map = GameMap::new(32, 32);
        let debris_cell = GridPosition::new(9, 9);
        let id = map.add_debris(debris_cell, DebrisKind::Car, Resources::new(1, 1, 1));
        assert_eq!(workshop_target_at(&map, debris_cell, 2), Ok(WorkshopTarget::Debris(id)));

        let rubble = GridPosition::new(8, 8);
        map.set_tile(rubble, TileKind::Rubble);
        assert_eq!(workshop_target_at(&map, rubble, 2), Ok(WorkshopTarget::Rubble));

        let camp = GridPosition::new(7, 7);
        map.add_to_camp(camp, Resources::new(1, 0, 0));
        assert_eq!(workshop_target_at(&map, camp, 2), Ok(WorkshopTarget::Camp(camp)));

        let charge = GridPosition::new(6, 6);
        map.set_tile(charge, TileKind::DemolitionCharge);
        assert_eq!(
            workshop_target_at(&map, charge, 2),
            Ok(WorkshopTarget::Demolition { bridge: None })
        );
    }

    #[test]
    fn test_stripped_ruin_door_yields_dropped_cargo() {
        let mut map = GameMap::new(32, 32);
        let ruin = map.add_ruin(GridPosition::new(12, 8), DoorSide::West, Resources::new(0, 3, 0), 1);
        let door = map.ruins[&ruin].door;
        map.drop_cargo(door, 10, 0);
        assert_eq!(workshop_target_at(&map, door, 2), Ok(WorkshopTarget::Ruin(ruin)));

        map.ruins.get_mut(&ruin).unwrap().goods = Resources::default();
        assert_eq!(workshop_target_at(&map, door, 2), Ok(WorkshopTarget::Cargo(door)));

        map.cargo.clear();
        assert_eq!(workshop_target_at(&map, door, 2), Ok(WorkshopTarget::Ruin(ruin)));
    }
}
