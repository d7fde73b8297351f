//! Noise propagation, hostile behaviour and outpost fire

use crate::core::types::{GridPosition, RuinId, StructureId, UnitId};
use crate::economy::outpost::Outpost;
use crate::economy::resources::ResourceKind;
use crate::economy::structure::{Structure, StructureKind};
use crate::economy::wall::Wall;
use crate::simulation::events::SimEventKind;
use crate::simulation::noise::NoiseLevel;
use crate::simulation::state::Simulation;
use crate::units::courier::Courier;
use crate::units::hostile::{AttackTarget, Hostile, HostileState};
use crate::units::movement::MoveStatus;
use crate::units::UnitKind;

impl Simulation {
    // ===== NOISE =====

    /// Broadcast a noise: may release ruin guards and redirect hostiles in range
    pub fn emit_noise(&mut self, cell: GridPosition, level: NoiseLevel) {
        if level == NoiseLevel::None {
            return;
        }
        let radius = level.radius();

        let guarded: Vec<RuinId> = self
            .map
            .ruins
            .values()
            .filter(|r| r.guards > 0 && r.distance_to(cell) <= radius)
            .map(|r| r.id)
            .collect();
        for rid in guarded {
            if !self.roll(level.trigger_chance()) {
                continue;
            }
            let Some(ruin) = self.map.ruins.get_mut(&rid) else {
                continue;
            };
            ruin.guards -= 1;
            let door = ruin.door;
            let hid = self.spawn_hostile(door);
            if let Some(h) = self.hostiles.get_mut(&hid) {
                h.respond_to_noise(&self.map, cell, level, false);
            }
            tracing::debug!("{:?} released a guard at {} after {:?} noise", rid, door, level);
        }

        let listeners: Vec<(UnitId, bool)> = self
            .hostiles
            .values()
            .filter(|h| h.cell().within_radius(&cell, radius))
            .map(|h| (h.id, self.fixed_target_alive(h)))
            .collect();
        for (hid, target_alive) in listeners {
            if let Some(h) = self.hostiles.get_mut(&hid) {
                h.respond_to_noise(&self.map, cell, level, target_alive);
            }
        }
    }

    fn fixed_target_alive(&self, hostile: &Hostile) -> bool {
        hostile.fixed_target.map(|t| self.is_live_depot(t)).unwrap_or(false)
    }

    // ===== HOSTILES =====

    pub(crate) fn update_hostiles(&mut self, dt: f32) {
        let ids: Vec<UnitId> = self.hostiles.keys().copied().collect();
        for id in ids {
            let Some(mut hostile) = self.hostiles.remove(&id) else {
                continue;
            };
            self.update_hostile(&mut hostile, dt);
            self.hostiles.insert(id, hostile);
        }
    }

    fn update_hostile(&mut self, hostile: &mut Hostile, dt: f32) {
        if hostile.wave && hostile.state != HostileState::Attacking && !self.fixed_target_alive(hostile) {
            hostile.fixed_target = None;
            if let Some((target, cell)) = self.nearest_depot(hostile.cell(), None) {
                hostile.hunt(&self.map, target, cell);
            }
        }

        match hostile.state {
            HostileState::Idle => {}
            HostileState::Moving => self.hostile_move(hostile, dt),
            HostileState::Attacking => self.hostile_attack(hostile, dt),
        }
    }

    fn hostile_move(&mut self, hostile: &mut Hostile, dt: f32) {
        let here = hostile.cell();
        let victim = self
            .couriers
            .values()
            .find(|c| c.cell().manhattan(&here) <= 1)
            .map(|c| c.id);
        if let Some(courier) = victim {
            self.infect_courier(courier);
        }

        if let Some(next) = hostile.mover.next_waypoint() {
            if let Some(sid) = self.map.structure_at(next) {
                if self.structures.get(&sid).map(Structure::blocks_movement).unwrap_or(false) {
                    hostile.start_attack(AttackTarget::Structure(sid));
                    return;
                }
            }
            // Terrain changed under the path
            if next != here && !self.map.is_passable(next) {
                let rerouted = hostile
                    .mover
                    .destination()
                    .map(|goal| hostile.mover.route_to(&self.map, goal))
                    .unwrap_or(false);
                if !rerouted {
                    hostile.become_idle();
                }
                return;
            }
        }

        let status = hostile
            .mover
            .advance(dt, self.config.hostile_speed, self.config.waypoint_tolerance);
        if let Some(target) = self.attack_target_at(hostile.cell()) {
            hostile.start_attack(target);
            return;
        }
        if status != MoveStatus::Moving {
            // Blocked goals are approached from a neighbour
            let adjacent = hostile
                .alert_source
                .filter(|goal| goal.manhattan(&hostile.cell()) <= 1)
                .and_then(|goal| self.attack_target_at(goal));
            match adjacent {
                Some(target) => hostile.start_attack(target),
                None => hostile.become_idle(),
            }
        }
    }

    fn attack_target_at(&self, cell: GridPosition) -> Option<AttackTarget> {
        if let Some(id) = self.map.structure_at(cell) {
            if self.structures.contains_key(&id) {
                return Some(AttackTarget::Structure(id));
            }
        }
        self.map.camp_at(cell).map(|_| AttackTarget::Camp(cell))
    }

    fn hostile_attack(&mut self, hostile: &mut Hostile, dt: f32) {
        let Some(target) = hostile.attack else {
            hostile.become_idle();
            return;
        };
        let exists = match target {
            AttackTarget::Structure(id) => self.structures.contains_key(&id),
            AttackTarget::Camp(cell) => self.map.camp_at(cell).is_some(),
        };
        if !exists {
            hostile.become_idle();
            return;
        }

        let hits = hostile.tick_attack(dt, self.config.hostile_attack_interval);
        if hits == 0 {
            return;
        }
        let finished = match target {
            AttackTarget::Structure(id) => self.damage_structure(id, hits),
            AttackTarget::Camp(cell) => {
                self.overrun_camp(cell);
                true
            }
        };
        if finished {
            hostile.become_idle();
        }
    }

    /// Apply hits to a structure; true once it is gone
    fn damage_structure(&mut self, id: StructureId, hits: u32) -> bool {
        let Some(s) = self.structures.get_mut(&id) else {
            return true;
        };
        if let StructureKind::Wall(_) = s.kind {
            let before = Wall::health(&s.present);
            let remaining = Wall::take_damage(&mut s.present, hits);
            self.ledger.wall_damage += before - remaining;
            if remaining > 0 {
                return false;
            }
        }
        self.overrun_structure(id);
        true
    }

    /// Destroy a structure outright: its people rise as hostiles, its goods hit the ground
    pub(crate) fn overrun_structure(&mut self, id: StructureId) {
        let Some(s) = self.remove_structure(id) else {
            return;
        };
        let mut holdings = s.holdings();
        if let StructureKind::Outpost(outpost) = &s.kind {
            self.ledger.wood_spent += outpost.construction_wood;
            holdings.wood -= outpost.construction_wood;
        }
        tracing::info!("{:?} {:?} overrun at {}", s.structure_type(), id, s.cell);
        self.convert_survivors(s.cell, holdings.survivors);
        self.drop_goods(s.cell, holdings);
    }

    fn overrun_camp(&mut self, cell: GridPosition) {
        let Some(camp) = self.map.remove_camp(cell) else {
            return;
        };
        tracing::info!("Camp at {} overrun", cell);
        self.push_event(SimEventKind::TileChanged { cell });
        self.convert_survivors(cell, camp.goods.survivors);
        self.drop_goods(cell, camp.goods);
    }

    fn infect_courier(&mut self, id: UnitId) {
        let Some(courier) = self.couriers.remove(&id) else {
            return;
        };
        let cell = courier.cell();
        self.unit_removed(id, UnitKind::Courier, cell);
        self.drop_goods(cell, courier.cargo);
        self.convert_survivors(cell, 1);
    }

    // ===== OUTPOSTS =====

    /// Closest hostile within `range`, ties to the lowest id
    pub fn nearest_hostile(&self, cell: GridPosition, range: u32) -> Option<(UnitId, GridPosition)> {
        self.hostiles
            .values()
            .map(|h| (h.id, h.cell()))
            .filter(|(_, c)| c.within_radius(&cell, range))
            .min_by_key(|(id, c)| (c.manhattan(&cell), *id))
    }

    pub(crate) fn update_outpost(&mut self, s: &mut Structure, dt: f32) {
        let interval = self.config.outpost_fire_interval;
        let excess = self.config.outpost_bullet_excess;
        let Some(outpost) = s.as_outpost() else {
            return;
        };
        let range = outpost.range(&self.config);
        let can_fire = outpost.can_fire(&s.present, &self.config);
        let target = self.nearest_hostile(s.cell, range);

        if target.is_none() && s.present.bullets >= s.quotas.bullets + excess && s.present.survivors > 0 {
            if let Some(depot) = s.servicer.filter(|d| self.is_live_depot(*d)) {
                self.return_bullets(s, depot, excess);
            }
        }

        let Some(outpost) = s.as_outpost_mut() else {
            return;
        };
        if !can_fire {
            return;
        }
        let Some((victim, victim_cell)) = target else {
            outpost.fire_timer = (outpost.fire_timer + dt).min(interval);
            return;
        };
        if !outpost.tick_fire(dt, interval) {
            return;
        }

        s.present.take(ResourceKind::Bullets, 1);
        self.ledger.bullets_fired += 1;
        let accuracy = Outpost::accuracy(s.present.survivors, &self.config);
        let hit = self.roll(accuracy);
        self.emit_noise(s.cell, NoiseLevel::High);
        if hit && self.hostiles.remove(&victim).is_some() {
            self.unit_removed(victim, UnitKind::Hostile, victim_cell);
        }
        self.push_event(SimEventKind::ShotFired { from: s.cell, to: Some(victim_cell), hit });
    }

    /// Ship surplus bullets home; the driver walks back afterwards
    fn return_bullets(&mut self, s: &mut Structure, depot: StructureId, amount: u32) {
        let Some(depot_cell) = self.structures.get(&depot).map(|d| d.cell) else {
            return;
        };
        s.present.take(ResourceKind::Bullets, amount);
        s.present.take(ResourceKind::Survivors, 1);
        let id = self.next_unit_id();
        let courier = Courier::new(id, s.cell, depot, depot_cell)
            .with_cargo(0, amount)
            .with_source(Some(s.id));
        self.spawn_courier(courier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BalanceConfig;
    use crate::economy::resources::Resources;
    use crate::economy::structure::StructureType;
    use crate::world::grid::GameMap;
    use crate::world::objects::DoorSide;

    fn sim() -> Simulation {
        Simulation::new(GameMap::new(32, 32), BalanceConfig::default(), 3)
    }

    #[test]
    fn test_high_noise_always_releases_a_guard() {
        let mut sim = sim();
        let rid = sim
            .map
            .add_ruin(GridPosition::new(10, 10), DoorSide::South, Resources::new(0, 5, 0), 2);
        sim.emit_noise(GridPosition::new(10, 5), NoiseLevel::High);
        assert_eq!(sim.map.ruins[&rid].guards, 1);
        assert_eq!(sim.hostiles.len(), 1);
        let h = sim.hostiles.values().next().unwrap();
        assert_eq!(h.cell(), GridPosition::new(10, 9));
        assert_eq!(h.state, HostileState::Moving);
    }

    #[test]
    fn test_released_guard_heads_for_noise() {
        let mut sim = sim();
        let rid = sim
            .map
            .add_ruin(GridPosition::new(10, 10), DoorSide::South, Resources::new(0, 5, 0), 1);
        let source = GridPosition::new(12, 6);
        sim.emit_noise(source, NoiseLevel::High);

        assert_eq!(sim.map.ruins[&rid].guards, 0);
        let h = sim.hostiles.values().next().unwrap();
        assert_eq!(h.alert, NoiseLevel::High);
        assert_eq!(h.alert_source, Some(source));
        assert_eq!(h.mover.destination(), Some(source));

        for _ in 0..40 {
            sim.update_hostiles(0.1);
        }
        assert_eq!(sim.hostiles.values().next().unwrap().cell(), source);
    }

    #[test]
    fn test_noise_out_of_range_is_ignored() {
        let mut sim = sim();
        sim.spawn_hostile(GridPosition::new(20, 20));
        sim.emit_noise(GridPosition::new(5, 5), NoiseLevel::High);
        assert_eq!(sim.hostiles.values().next().unwrap().state, HostileState::Idle);
    }

    #[test]
    fn test_hostile_infects_adjacent_courier() {
        let mut sim = sim();
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(2, 2)).unwrap();
        let hid = sim.spawn_hostile(GridPosition::new(10, 10));
        sim.hostiles.get_mut(&hid).unwrap().respond_to_noise(&sim.map, GridPosition::new(14, 10), NoiseLevel::Low, false);

        let cid = sim.next_unit_id();
        let courier = Courier::new(cid, GridPosition::new(11, 10), depot, GridPosition::new(2, 2)).with_cargo(10, 0);
        sim.couriers.insert(cid, courier);

        sim.update_hostiles(0.05);
        assert!(sim.couriers.is_empty());
        assert_eq!(sim.hostiles.len(), 2);
        assert_eq!(sim.map.cargo_at(GridPosition::new(11, 10)).map(|c| c.wood), Some(10));
        assert_eq!(sim.ledger.survivors_lost, 1);
    }

    #[test]
    fn test_wall_loses_one_wood_per_hit() {
        let mut sim = sim();
        sim.place_structure(StructureType::Depot, GridPosition::new(2, 2)).unwrap();
        let wall = sim.place_structure(StructureType::Wall, GridPosition::new(5, 2)).unwrap();
        sim.structures.get_mut(&wall).unwrap().present.wood = 3;

        let hid = sim.spawn_hostile(GridPosition::new(6, 2));
        sim.hostiles.get_mut(&hid).unwrap().start_attack(AttackTarget::Structure(wall));
        sim.update_hostiles(0.1);
        assert_eq!(sim.structure(wall).unwrap().present.wood, 2);
        sim.update_hostiles(0.2);
        assert!(sim.structure(wall).is_none());
        assert_eq!(sim.ledger.wall_damage, 3);
        assert_eq!(sim.hostiles[&hid].state, HostileState::Idle);
    }

    #[test]
    fn test_overrun_converts_survivors_and_drops_goods() {
        let mut sim = sim();
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(2, 2)).unwrap();
        sim.overrun_structure(depot);
        // 5 free survivors rise, 50 wood and 50 bullets fall
        assert_eq!(sim.hostiles.len(), 5);
        let cargo = sim.map.cargo_at(GridPosition::new(2, 2)).unwrap();
        assert_eq!((cargo.wood, cargo.bullets), (50, 50));
        assert_eq!(sim.map.structure_at(GridPosition::new(2, 2)), None);
    }

    #[test]
    fn test_camp_overrun() {
        let mut sim = sim();
        let cell = GridPosition::new(8, 8);
        sim.make_camp(cell, Resources::new(2, 5, 0));
        let hid = sim.spawn_hostile(cell);
        sim.hostiles.get_mut(&hid).unwrap().start_attack(AttackTarget::Camp(cell));
        sim.update_hostiles(0.1);
        assert!(sim.map.camp_at(cell).is_none());
        assert_eq!(sim.hostiles.len(), 3);
        assert_eq!(sim.map.cargo_at(cell).map(|c| c.wood), Some(5));
    }
}
