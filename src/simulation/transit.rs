//! Unit transit: couriers and civilians walking their routes
//!
//! A unit whose destination disappears either retargets or becomes lost.
//! Lost units wander a few cells toward their old destination and then
//! settle into a camp with everything they carry.

use crate::core::types::UnitId;
use crate::economy::resources::{ResourceKind, Resources};
use crate::simulation::noise::NoiseLevel;
use crate::simulation::state::Simulation;
use crate::units::movement::{wander_route, MoveStatus, PathFollower};
use crate::units::{Civilian, Courier, UnitKind};

/// Drive a lost unit along its wander path; true once it has settled
fn wander(mover: &mut PathFollower, dt: f32, speed: f32, tolerance: f32) -> bool {
    !matches!(mover.advance(dt, speed, tolerance), MoveStatus::Moving)
}

impl Simulation {
    // ===== COURIERS =====

    pub(crate) fn update_couriers(&mut self, dt: f32) {
        let ids: Vec<UnitId> = self.couriers.keys().copied().collect();
        for id in ids {
            let Some(mut courier) = self.couriers.remove(&id) else {
                continue;
            };
            if self.update_courier(&mut courier, dt) {
                self.couriers.insert(id, courier);
            }
        }
    }

    /// Returns false once the courier has left the registry for good
    fn update_courier(&mut self, courier: &mut Courier, dt: f32) -> bool {
        let speed = self.config.courier_speed;
        let tolerance = self.config.waypoint_tolerance;

        if courier.lost {
            if wander(&mut courier.mover, dt, speed, tolerance) {
                self.settle_courier(courier);
                return false;
            }
            self.emit_noise(courier.cell(), NoiseLevel::Low);
            return true;
        }

        if !self.is_structure_alive(courier.destination) {
            self.redirect_courier(courier);
            if courier.lost {
                return self.start_wandering_courier(courier);
            }
        }

        if !courier.mover.has_path() && !courier.mover.route_to(&self.map, courier.destination_cell) {
            tracing::debug!("Courier {:?} has no route to {}", courier.id, courier.destination_cell);
            courier.lost = true;
            return self.start_wandering_courier(courier);
        }

        match courier.mover.advance(dt, speed, tolerance) {
            MoveStatus::Arrived => {
                self.deliver(courier);
                false
            }
            MoveStatus::Moving => {
                self.emit_noise(courier.cell(), NoiseLevel::Low);
                true
            }
            MoveStatus::Idle => true,
        }
    }

    /// The destination is gone: pick a new depot or give up
    fn redirect_courier(&mut self, courier: &mut Courier) {
        let here = courier.cell();
        let next = if courier.to_depot {
            let chance = self.config.retarget_chance;
            if self.roll(chance) {
                self.nearest_depot(here, Some(courier.destination))
            } else {
                None
            }
        } else {
            courier
                .source
                .filter(|s| self.is_live_depot(*s))
                .and_then(|s| self.structures.get(&s).map(|d| (d.id, d.cell)))
                .or_else(|| self.nearest_depot(here, None))
        };
        match next {
            Some((depot, cell)) => {
                tracing::debug!("Courier {:?} retargeted to {:?}", courier.id, depot);
                courier.retarget(depot, cell);
            }
            None => courier.lost = true,
        }
    }

    fn start_wandering_courier(&mut self, courier: &mut Courier) -> bool {
        match wander_route(&self.map, courier.cell(), courier.destination_cell, self.config.wander_distance) {
            Some(path) => {
                courier.mover.set_path(path);
                true
            }
            None => {
                self.settle_courier(courier);
                false
            }
        }
    }

    fn settle_courier(&mut self, courier: &Courier) {
        let cell = courier.cell();
        tracing::info!("Lost courier {:?} made camp at {}", courier.id, cell);
        self.make_camp(cell, courier.holdings());
        self.unit_removed(courier.id, UnitKind::Courier, cell);
    }

    fn deliver(&mut self, courier: &Courier) {
        let cell = courier.cell();
        let destination = courier.destination;
        let Some(mut target) = self.structures.remove(&destination) else {
            // Vanished on the arrival step
            self.make_camp(cell, courier.holdings());
            self.unit_removed(courier.id, UnitKind::Courier, cell);
            return;
        };

        let before = target.holdings().wood;
        target.receive(ResourceKind::Wood, courier.cargo.wood, &self.config);
        target.receive(ResourceKind::Bullets, courier.cargo.bullets, &self.config);
        let expected = before + courier.cargo.wood;
        self.ledger.wood_spent += expected.saturating_sub(target.holdings().wood);

        let shuttle = courier.return_to.filter(|w| self.is_structure_alive(*w));
        let source_alive = courier.source.map(|s| self.is_structure_alive(s)).unwrap_or(false);
        let rider_home = if shuttle.is_some() {
            shuttle
        } else if !source_alive {
            if target.is_depot() {
                None
            } else {
                self.nearest_depot(target.cell, None).map(|(id, _)| id)
            }
        } else if target.is_depot() && (courier.from_workshop || (target.needs(ResourceKind::Survivors) && courier.was_surplus)) {
            None
        } else {
            courier.source
        };

        let stays = target.is_depot() && rider_home.is_none();
        if stays {
            target.receive(ResourceKind::Survivors, 1, &self.config);
        }
        let target_cell = target.cell;
        self.structures.insert(destination, target);
        if !stays {
            self.spawn_civilian(target_cell, rider_home);
        }
        self.unit_removed(courier.id, UnitKind::Courier, cell);
    }

    // ===== CIVILIANS =====

    pub(crate) fn update_civilians(&mut self, dt: f32) {
        let ids: Vec<UnitId> = self.civilians.keys().copied().collect();
        for id in ids {
            let Some(mut civilian) = self.civilians.remove(&id) else {
                continue;
            };
            if self.update_civilian(&mut civilian, dt) {
                self.civilians.insert(id, civilian);
            }
        }
    }

    fn update_civilian(&mut self, civilian: &mut Civilian, dt: f32) -> bool {
        let speed = self.config.civilian_speed;
        let tolerance = self.config.waypoint_tolerance;

        if civilian.lost {
            if wander(&mut civilian.mover, dt, speed, tolerance) {
                self.settle_civilian(civilian);
                return false;
            }
            self.emit_noise(civilian.cell(), NoiseLevel::Low);
            return true;
        }

        let alive = civilian.destination.map(|d| self.is_structure_alive(d)).unwrap_or(false);
        if !alive {
            self.redirect_civilian(civilian);
            if civilian.lost {
                return self.start_wandering_civilian(civilian);
            }
        }

        let Some(goal) = civilian.destination_cell else {
            civilian.lost = true;
            return self.start_wandering_civilian(civilian);
        };
        if !civilian.mover.has_path() && !civilian.mover.route_to(&self.map, goal) {
            civilian.lost = true;
            return self.start_wandering_civilian(civilian);
        }

        match civilian.mover.advance(dt, speed, tolerance) {
            MoveStatus::Arrived => {
                self.arrive(civilian);
                false
            }
            MoveStatus::Moving => {
                self.emit_noise(civilian.cell(), NoiseLevel::Low);
                true
            }
            MoveStatus::Idle => true,
        }
    }

    fn redirect_civilian(&mut self, civilian: &mut Civilian) {
        if civilian.destination.is_none() {
            civilian.lost = true;
            return;
        }
        let here = civilian.cell();
        let next = if civilian.to_depot {
            let chance = self.config.retarget_chance;
            if self.roll(chance) {
                self.nearest_depot(here, civilian.destination)
            } else {
                None
            }
        } else {
            self.nearest_depot(here, None)
        };
        match next {
            Some((depot, cell)) => civilian.set_destination(depot, cell, true),
            None => civilian.lost = true,
        }
    }

    fn start_wandering_civilian(&mut self, civilian: &mut Civilian) -> bool {
        let Some(toward) = civilian.destination_cell else {
            self.settle_civilian(civilian);
            return false;
        };
        match wander_route(&self.map, civilian.cell(), toward, self.config.wander_distance) {
            Some(path) => {
                civilian.mover.set_path(path);
                true
            }
            None => {
                self.settle_civilian(civilian);
                false
            }
        }
    }

    fn settle_civilian(&mut self, civilian: &Civilian) {
        let cell = civilian.cell();
        tracing::info!("Lost civilian {:?} made camp at {}", civilian.id, cell);
        self.make_camp(cell, Resources::new(1, 0, 0));
        self.unit_removed(civilian.id, UnitKind::Civilian, cell);
    }

    fn arrive(&mut self, civilian: &Civilian) {
        let cell = civilian.cell();
        let target = civilian.destination.and_then(|d| self.structures.get_mut(&d));
        match target {
            Some(s) => s.receive(ResourceKind::Survivors, 1, &self.config),
            None => self.make_camp(cell, Resources::new(1, 0, 0)),
        }
        self.unit_removed(civilian.id, UnitKind::Civilian, cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BalanceConfig;
    use crate::core::types::GridPosition;
    use crate::economy::structure::StructureType;
    use crate::units::HostileState;
    use crate::world::grid::GameMap;

    fn sim_with_depot() -> (Simulation, crate::core::types::StructureId) {
        let mut sim = Simulation::new(GameMap::new(32, 32), BalanceConfig::default(), 9);
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(10, 10)).unwrap();
        (sim, depot)
    }

    fn sim_with_retarget_chance(chance: f64) -> (Simulation, crate::core::types::StructureId) {
        let config = BalanceConfig {
            retarget_chance: chance,
            ..BalanceConfig::default()
        };
        let mut sim = Simulation::new(GameMap::new(32, 32), config, 9);
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(10, 10)).unwrap();
        (sim, depot)
    }

    #[test]
    fn test_stranded_courier_wanders_then_camps() {
        let (mut sim, depot) = sim_with_depot();
        let id = sim.next_unit_id();
        let courier = Courier::new(id, GridPosition::new(20, 10), depot, GridPosition::new(10, 10)).with_cargo(7, 0);
        sim.spawn_courier(courier);
        sim.remove_structure(depot);

        for _ in 0..40 {
            sim.update_couriers(0.1);
        }
        assert!(sim.couriers.is_empty());
        let camp = sim.map.camp_at(GridPosition::new(16, 10)).unwrap();
        assert_eq!(camp.goods, Resources::new(1, 7, 0));
    }

    #[test]
    fn test_civilian_joins_structure_on_arrival() {
        let (mut sim, _) = sim_with_depot();
        let outpost = sim.place_structure(StructureType::Outpost, GridPosition::new(12, 10)).unwrap();
        sim.spawn_civilian(GridPosition::new(11, 10), Some(outpost));
        for _ in 0..10 {
            sim.update_civilians(0.1);
        }
        assert!(sim.civilians.is_empty());
        assert_eq!(sim.structure(outpost).unwrap().present.survivors, 1);
    }

    #[test]
    fn test_transfer_rider_walks_back_when_not_needed() {
        let (mut sim, first) = sim_with_depot();
        let second = sim.place_structure(StructureType::Depot, GridPosition::new(14, 10)).unwrap();
        let id = sim.next_unit_id();
        let courier = Courier::new(id, GridPosition::new(14, 10), second, GridPosition::new(14, 10))
            .with_cargo(10, 0)
            .with_source(Some(first));
        sim.deliver(&courier);

        assert_eq!(sim.structure(second).unwrap().present.wood, 10);
        assert_eq!(sim.civilians.len(), 1);
        assert_eq!(sim.civilians.values().next().unwrap().destination, Some(first));
    }

    #[test]
    fn test_workshop_driver_stays_at_depot() {
        let (mut sim, depot) = sim_with_depot();
        let id = sim.next_unit_id();
        let mut courier = Courier::new(id, GridPosition::new(10, 10), depot, GridPosition::new(10, 10))
            .with_cargo(4, 2)
            .with_source(Some(depot));
        courier.from_workshop = true;
        sim.deliver(&courier);

        assert_eq!(sim.structure(depot).unwrap().present, Resources::new(6, 54, 52));
        assert!(sim.civilians.is_empty());
    }

    #[test]
    fn test_walking_civilian_alerts_nearby_hostile() {
        let (mut sim, _) = sim_with_depot();
        let outpost = sim.place_structure(StructureType::Outpost, GridPosition::new(16, 10)).unwrap();
        let hid = sim.spawn_hostile(GridPosition::new(12, 12));
        sim.spawn_civilian(GridPosition::new(12, 10), Some(outpost));

        sim.update_civilians(0.1);
        let h = &sim.hostiles[&hid];
        assert_eq!(h.state, HostileState::Moving);
        assert_eq!(h.alert_source, Some(GridPosition::new(12, 10)));
    }

    #[test]
    fn test_civilian_retargets_when_depot_dies() {
        let (mut sim, doomed) = sim_with_retarget_chance(1.0);
        let refuge = sim.place_structure(StructureType::Depot, GridPosition::new(14, 10)).unwrap();
        let id = sim.spawn_civilian(GridPosition::new(20, 10), Some(doomed));
        sim.remove_structure(doomed);

        sim.update_civilians(0.1);
        let civilian = &sim.civilians[&id];
        assert!(!civilian.lost);
        assert_eq!(civilian.destination, Some(refuge));
    }

    #[test]
    fn test_civilian_camps_when_retarget_fails() {
        let (mut sim, doomed) = sim_with_retarget_chance(0.0);
        sim.place_structure(StructureType::Depot, GridPosition::new(14, 10)).unwrap();
        sim.spawn_civilian(GridPosition::new(20, 10), Some(doomed));
        sim.remove_structure(doomed);

        for _ in 0..40 {
            sim.update_civilians(0.1);
        }
        assert!(sim.civilians.is_empty());
        let camp = sim.map.camp_at(GridPosition::new(16, 10)).unwrap();
        assert_eq!(camp.goods, Resources::new(1, 0, 0));
    }

    #[test]
    fn test_shuttle_driver_walks_back_to_workshop() {
        let (mut sim, depot) = sim_with_depot();
        sim.map.set_tile(GridPosition::new(13, 10), crate::world::grid::TileKind::Rubble);
        let workshop = sim.place_structure(StructureType::Workshop, GridPosition::new(13, 10)).unwrap();
        let id = sim.next_unit_id();
        let mut courier = Courier::new(id, GridPosition::new(10, 10), depot, GridPosition::new(10, 10))
            .with_cargo(10, 0)
            .with_source(Some(depot));
        courier.from_workshop = true;
        courier.return_to = Some(workshop);
        sim.deliver(&courier);

        assert_eq!(sim.structure(depot).unwrap().present, Resources::new(5, 60, 50));
        assert_eq!(sim.civilians.len(), 1);
        assert_eq!(sim.civilians.values().next().unwrap().destination, Some(workshop));
    }

    #[test]
    fn test_shuttle_driver_stays_once_workshop_closed() {
        let (mut sim, depot) = sim_with_depot();
        sim.map.set_tile(GridPosition::new(13, 10), crate::world::grid::TileKind::Rubble);
        let workshop = sim.place_structure(StructureType::Workshop, GridPosition::new(13, 10)).unwrap();
        sim.remove_structure(workshop);
        let id = sim.next_unit_id();
        let mut courier = Courier::new(id, GridPosition::new(10, 10), depot, GridPosition::new(10, 10))
            .with_cargo(10, 0)
            .with_source(Some(depot));
        courier.from_workshop = true;
        courier.return_to = Some(workshop);
        sim.deliver(&courier);

        assert_eq!(sim.structure(depot).unwrap().present, Resources::new(6, 60, 50));
        assert!(sim.civilians.is_empty());
    }
}
