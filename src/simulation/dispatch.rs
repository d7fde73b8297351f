//! Structure phase: depot dispatch, workshop harvesting and shipping, retreat

use crate::core::error::{ColonyError, Result};
use crate::core::types::{GridPosition, StructureId};
use crate::economy::depot::{can_supply_sibling, plan_dispatch, DispatchOrder};
use crate::economy::resources::ResourceKind;
use crate::economy::structure::{Structure, StructureKind};
use crate::economy::workshop::{collection_rate, Shipment, WorkshopTarget};
use crate::simulation::events::SimEventKind;
use crate::simulation::noise::NoiseLevel;
use crate::simulation::state::Simulation;
use crate::units::courier::Courier;
use crate::world::grid::TileKind;

/// What one completed collection tick did to the workshop
struct Collection {
    /// Target has nothing left
    exhausted: bool,
    /// The unit counted toward the noise threshold
    counted: bool,
}

impl Simulation {
    // ===== STRUCTURE PHASE =====

    pub(crate) fn update_structures(&mut self, dt: f32) {
        let ids: Vec<StructureId> = self.structures.keys().copied().collect();
        for id in ids {
            let Some(mut s) = self.structures.remove(&id) else {
                continue;
            };
            if !s.is_depot() && !s.servicer.map(|d| self.is_live_depot(d)).unwrap_or(false) {
                s.servicer = self.pick_servicer(s.cell, s.id);
            }

            match s.kind {
                StructureKind::Depot(_) => self.update_depot(&mut s, dt),
                StructureKind::Workshop(_) => self.update_workshop(&mut s, dt),
                StructureKind::Outpost(_) => self.update_outpost(&mut s, dt),
                StructureKind::Wall(_) => {}
            }

            if s.is_destroyed() {
                self.release_remains(&mut s);
                self.retire_structure(&s);
            } else {
                self.structures.insert(id, s);
            }
        }
    }

    /// Whatever a collapsing structure still holds: goods drop, people walk to a depot
    fn release_remains(&mut self, s: &mut Structure) {
        let remains = s.present.drain();
        if remains.is_empty() {
            return;
        }
        self.drop_goods(s.cell, remains);
        let home = self.nearest_depot(s.cell, Some(s.id)).map(|(id, _)| id);
        for _ in 0..remains.survivors {
            self.spawn_civilian(s.cell, home);
        }
    }

    // ===== DEPOTS =====

    fn update_depot(&mut self, s: &mut Structure, dt: f32) {
        let interval = self.config.dispatch_interval;
        let Some(depot) = s.as_depot_mut() else {
            return;
        };
        depot.update_prioritizations(dt);
        if !depot.tick_dispatch(dt, interval) {
            return;
        }

        let capacity = self.config.truck_capacity;
        let service = self.config.depot_service_radius;
        let sibling_radius = self.config.sibling_depot_radius;

        // Tier 1: the neediest structure in range, draining below quota if need be
        let needy = self
            .structures
            .values()
            .filter(|t| !t.is_depot() && !t.is_destroyed() && t.cell.within_radius(&s.cell, service))
            .map(|t| self.with_incoming(t))
            .filter(Structure::needs_any)
            .max_by_key(|t| (t.total_deficit(), std::cmp::Reverse(t.id)))
            .and_then(|t| plan_dispatch(s, &t, true, capacity).map(|order| (t.id, t.cell, order)));
        if let Some((target, cell, order)) = needy {
            self.execute_dispatch(s, target, cell, order);
            return;
        }

        // Tier 2: a sibling depot, from strict surplus only
        let sibling = self
            .live_depots()
            .filter(|d| d.cell.within_radius(&s.cell, sibling_radius))
            .map(|d| self.with_incoming(d))
            .filter(|d| can_supply_sibling(s, d))
            .max_by_key(|d| (d.total_deficit(), std::cmp::Reverse(d.id)))
            .and_then(|d| plan_dispatch(s, &d, false, capacity).map(|order| (d.id, d.cell, order)));
        if let Some((target, cell, order)) = sibling {
            self.execute_dispatch(s, target, cell, order);
        }
    }

    /// A copy of `target` counting goods and people already on their way to it
    fn with_incoming(&self, target: &Structure) -> Structure {
        let mut view = target.clone();
        for c in self.couriers.values().filter(|c| c.destination == target.id && !c.lost) {
            view.present.merge(c.cargo);
        }
        let walking = self
            .civilians
            .values()
            .filter(|c| c.destination == Some(target.id) && !c.lost)
            .count() as u32;
        let shuttling = self
            .couriers
            .values()
            .filter(|c| c.return_to == Some(target.id) && !c.lost)
            .count() as u32;
        view.present.add(ResourceKind::Survivors, walking + shuttling);
        view
    }

    fn execute_dispatch(&mut self, depot: &mut Structure, target: StructureId, target_cell: GridPosition, order: DispatchOrder) {
        match order {
            DispatchOrder::Walker => {
                depot.present.take(ResourceKind::Survivors, 1);
                self.spawn_civilian(depot.cell, Some(target));
            }
            DispatchOrder::Courier { kind, amount, was_surplus } => {
                let amount = depot.present.take(kind, amount);
                depot.present.take(ResourceKind::Survivors, 1);
                let id = self.next_unit_id();
                let mut courier = Courier::new(id, depot.cell, target, target_cell).with_source(Some(depot.id));
                courier.cargo.add(kind, amount);
                courier.was_surplus = was_surplus;
                self.spawn_courier(courier);
            }
        }
    }

    // ===== WORKSHOPS =====

    fn update_workshop(&mut self, s: &mut Structure, dt: f32) {
        let workers = s.present.survivors;
        let Some(workshop) = s.as_workshop() else {
            return;
        };
        if workshop.finished || workers == 0 {
            return;
        }

        if workshop.closing {
            let delay = self.config.workshop_closeout_delay;
            let elapsed = match &mut s.kind {
                StructureKind::Workshop(w) => w.tick_closeout(dt, delay),
                _ => false,
            };
            if elapsed {
                self.finish_workshop(s);
            }
            return;
        }

        let rate = collection_rate(workers, self.config.workshop_base_rate, self.config.workshop_rate_growth);
        let completed = match &mut s.kind {
            StructureKind::Workshop(w) => w.accumulate(dt, rate),
            _ => 0,
        };
        for _ in 0..completed {
            let Collection { exhausted, counted } = self.collect_once(s);
            let threshold = self.config.workshop_noise_threshold;
            let noisy = counted
                && match &mut s.kind {
                    StructureKind::Workshop(w) => w.register_unit(threshold),
                    _ => false,
                };
            if noisy {
                self.emit_noise(s.cell, NoiseLevel::Medium);
            }
            if exhausted {
                if let StructureKind::Workshop(w) = &mut s.kind {
                    w.request_close();
                }
                break;
            }
        }

        self.ship_from_workshop(s, dt);
    }

    /// Take one unit from the workshop's target
    fn collect_once(&mut self, s: &mut Structure) -> Collection {
        let cell = s.cell;
        let StructureKind::Workshop(w) = &mut s.kind else {
            return Collection { exhausted: true, counted: false };
        };

        match w.target {
            WorkshopTarget::Ruin(rid) => {
                let Some(ruin) = self.map.ruins.get_mut(&rid) else {
                    return Collection { exhausted: true, counted: false };
                };
                let taken = ruin.goods.take_one_by_priority();
                if let Some(kind) = taken {
                    w.collected.add(kind, 1);
                }
                Collection { exhausted: !ruin.can_be_harvested(), counted: taken.is_some() }
            }
            WorkshopTarget::Debris(did) => {
                let Some(pile) = self.map.debris.get_mut(&did) else {
                    return Collection { exhausted: true, counted: false };
                };
                let taken = pile.goods.take_one_by_priority();
                if let Some(kind) = taken {
                    w.collected.add(kind, 1);
                }
                Collection { exhausted: !pile.has_goods(), counted: taken.is_some() }
            }
            WorkshopTarget::Camp(camp_cell) => {
                let Some(camp) = self.map.camps.get_mut(&camp_cell) else {
                    return Collection { exhausted: true, counted: false };
                };
                let taken = camp.goods.take_one_by_priority();
                if let Some(kind) = taken {
                    w.collected.add(kind, 1);
                }
                let emptied = camp.is_empty();
                if emptied {
                    self.map.remove_camp(camp_cell);
                    self.push_event(SimEventKind::TileChanged { cell: camp_cell });
                }
                Collection { exhausted: emptied, counted: taken.is_some() }
            }
            WorkshopTarget::Cargo(cargo_cell) => {
                let Some(cargo) = self.map.cargo.get_mut(&cargo_cell) else {
                    return Collection { exhausted: true, counted: false };
                };
                let mut goods = cargo.as_resources();
                let taken = [ResourceKind::Wood, ResourceKind::Bullets]
                    .into_iter()
                    .find(|kind| goods.take(*kind, 1) == 1);
                cargo.wood = goods.wood;
                cargo.bullets = goods.bullets;
                if let Some(kind) = taken {
                    w.collected.add(kind, 1);
                }
                let emptied = cargo.is_empty();
                if emptied {
                    self.map.cargo.remove(&cargo_cell);
                    self.push_event(SimEventKind::TileChanged { cell: cargo_cell });
                }
                Collection { exhausted: emptied, counted: taken.is_some() }
            }
            WorkshopTarget::Demolition { bridge } => {
                w.progress += 1;
                if w.progress < self.config.demolition_charges {
                    return Collection { exhausted: false, counted: true };
                }
                let link = self.config.demolition_link_radius;
                let bridge = bridge
                    .filter(|b| self.map.bridges.get(b).map(|b| b.is_functional()).unwrap_or(false))
                    .or_else(|| self.map.bridge_for_charge(cell, link));
                if let Some(bridge) = bridge {
                    let cells = self.map.destroy_bridge(bridge);
                    tracing::info!("Bridge {:?} demolished from {}", bridge, cell);
                    for changed in &cells {
                        self.push_event(SimEventKind::TileChanged { cell: *changed });
                    }
                    self.push_event(SimEventKind::BridgeDestroyed { id: bridge, cells });
                }
                self.emit_noise(cell, NoiseLevel::High);
                Collection { exhausted: true, counted: true }
            }
            WorkshopTarget::Rubble => {
                w.progress += 1;
                w.collected.add(ResourceKind::Wood, 1);
                self.ledger.salvaged_wood += 1;
                if w.progress < self.config.rubble_clear_amount {
                    return Collection { exhausted: false, counted: true };
                }
                self.map.set_tile(cell, TileKind::Ground);
                self.push_event(SimEventKind::TileChanged { cell });
                Collection { exhausted: true, counted: true }
            }
        }
    }

    /// Periodic shipping to the servicing depot
    fn ship_from_workshop(&mut self, s: &mut Structure, dt: f32) {
        let Some(depot) = s.servicer.filter(|d| self.is_live_depot(*d)) else {
            return;
        };
        let interval = self.config.workshop_truck_interval();
        let capacity = self.config.truck_capacity;
        let workers = s.present.survivors;
        let shipments = match &mut s.kind {
            StructureKind::Workshop(w) => w.next_shipment(dt, interval, workers, capacity),
            _ => return,
        };
        for shipment in shipments {
            self.send_shipment(s, depot, shipment);
        }
    }

    fn send_shipment(&mut self, s: &mut Structure, depot: StructureId, shipment: Shipment) {
        let Some(depot_cell) = self.structures.get(&depot).map(|d| d.cell) else {
            return;
        };
        let (wood, bullets, return_to) = match shipment {
            Shipment::Courier { wood, bullets } => (wood, bullets, None),
            Shipment::Shuttle { wood, bullets } => (wood, bullets, Some(s.id)),
            Shipment::Walker => {
                self.spawn_civilian(s.cell, Some(depot));
                return;
            }
        };
        s.present.take(ResourceKind::Survivors, 1);
        let id = self.next_unit_id();
        let mut courier = Courier::new(id, s.cell, depot, depot_cell)
            .with_cargo(wood, bullets)
            .with_source(Some(depot));
        courier.from_workshop = true;
        courier.return_to = return_to;
        self.spawn_courier(courier);
    }

    /// Empty the workshop: final couriers, dropped leftovers, workers walk home
    pub(crate) fn finish_workshop(&mut self, s: &mut Structure) {
        let capacity = self.config.truck_capacity;
        let depot = s.servicer.filter(|d| self.is_live_depot(*d));
        let workers = s.present.survivors;
        let StructureKind::Workshop(w) = &mut s.kind else {
            return;
        };
        w.finished = true;
        let target = w.target;
        let shipments = if depot.is_some() { w.final_shipments(workers, capacity) } else { Vec::new() };
        let leftover = w.collected.drain();

        match target {
            WorkshopTarget::Debris(did) => {
                let spent = self.map.debris.get(&did).map(|p| !p.has_goods()).unwrap_or(false);
                if spent {
                    if let Some(pile) = self.map.remove_debris(did) {
                        self.push_event(SimEventKind::TileChanged { cell: pile.cell });
                    }
                }
            }
            WorkshopTarget::Ruin(rid) => {
                if let Some(ruin) = self.map.ruins.get_mut(&rid) {
                    ruin.workshop = None;
                }
            }
            _ => {}
        }

        if let Some(depot) = depot {
            for shipment in shipments {
                self.send_shipment(s, depot, shipment);
            }
        }
        let cell = s.cell;
        let mut remains = s.present.drain();
        remains.merge(leftover);
        self.drop_goods(cell, remains);
        for _ in 0..remains.survivors {
            self.spawn_civilian(cell, depot);
        }
        tracing::debug!("Workshop {:?} finished at {}", s.id, cell);
    }

    // ===== RETREAT =====

    /// Empty a structure and remove it
    pub fn retreat(&mut self, id: StructureId) -> Result<()> {
        let mut s = self.structures.remove(&id).ok_or(ColonyError::StructureNotFound(id))?;
        match s.kind {
            StructureKind::Depot(_) => self.retreat_depot(&mut s),
            StructureKind::Workshop(_) => self.finish_workshop(&mut s),
            StructureKind::Outpost(_) | StructureKind::Wall(_) => self.retreat_defence(&mut s),
        }
        tracing::info!("Retreated from {:?} {:?}", s.structure_type(), id);
        self.retire_structure(&s);
        Ok(())
    }

    fn retreat_depot(&mut self, s: &mut Structure) {
        let other = self.nearest_depot(s.cell, Some(s.id)).map(|(id, _)| id);
        let goods = s.present.drain();
        self.drop_goods(s.cell, goods);
        for _ in 0..goods.survivors {
            self.spawn_civilian(s.cell, other);
        }
        if let Some(depot) = s.as_depot_mut() {
            depot.abandoned = other.is_some();
        }
    }

    /// Outposts and walls: truck goods to a nearby depot, or drop them when none is close
    fn retreat_defence(&mut self, s: &mut Structure) {
        if let StructureKind::Outpost(outpost) = &mut s.kind {
            self.ledger.wood_spent += outpost.construction_wood;
            outpost.construction_wood = 0;
        }
        let mut goods = s.present.drain();
        let nearest = self.nearest_depot(s.cell, None);
        let safe = nearest.filter(|(_, cell)| cell.within_radius(&s.cell, self.config.retreat_safe_radius));

        if let Some((depot, depot_cell)) = safe {
            let capacity = self.config.truck_capacity;
            while goods.has_goods() && goods.survivors > 0 {
                let wood = goods.take(ResourceKind::Wood, capacity);
                let bullets = goods.take(ResourceKind::Bullets, capacity - wood);
                goods.survivors -= 1;
                let id = self.next_unit_id();
                let mut courier = Courier::new(id, s.cell, depot, depot_cell)
                    .with_cargo(wood, bullets)
                    .with_source(Some(depot));
                courier.from_workshop = true;
                self.spawn_courier(courier);
            }
        }
        self.drop_goods(s.cell, goods);
        let home = nearest.map(|(id, _)| id);
        for _ in 0..goods.survivors {
            self.spawn_civilian(s.cell, home);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BalanceConfig;
    use crate::economy::resources::Resources;
    use crate::economy::structure::StructureType;
    use crate::world::grid::GameMap;
    use crate::world::objects::{DebrisKind, DoorSide};

    fn sim_with_depot() -> (Simulation, StructureId) {
        let mut sim = Simulation::new(GameMap::new(32, 32), BalanceConfig::default(), 5);
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(10, 10)).unwrap();
        (sim, depot)
    }

    #[test]
    fn test_depot_sends_walker_then_courier() {
        let (mut sim, depot) = sim_with_depot();
        let wall = sim.place_structure(StructureType::Wall, GridPosition::new(13, 10)).unwrap();
        sim.structures.get_mut(&wall).unwrap().quotas.survivors = 1;

        sim.update_structures(0.1);
        assert_eq!(sim.civilians.len(), 1);
        assert_eq!(sim.structure(depot).unwrap().present.survivors, 4);

        // Walker arrives; the wall still needs 10 wood
        sim.structures.get_mut(&wall).unwrap().present.survivors = 1;
        sim.update_structures(0.5);
        assert_eq!(sim.couriers.len(), 1);
        let courier = sim.couriers.values().next().unwrap();
        assert_eq!(courier.cargo.wood, 10);
        assert_eq!(sim.structure(depot).unwrap().present, Resources::new(3, 40, 50));
    }

    #[test]
    fn test_rubble_clearing_restores_ground() {
        let (mut sim, _) = sim_with_depot();
        let cell = GridPosition::new(12, 10);
        sim.map.set_tile(cell, TileKind::Rubble);
        let ws = sim.place_structure(StructureType::Workshop, cell).unwrap();
        sim.structures.get_mut(&ws).unwrap().present.survivors = 1;
        if let Some(StructureKind::Workshop(w)) = sim.structures.get_mut(&ws).map(|s| &mut s.kind) {
            w.progress = 19;
            w.collection_timer = 0.95;
        }
        sim.update_structures(0.1);
        assert_eq!(sim.map.tile_kind(cell), Some(TileKind::Ground));
        assert_eq!(sim.ledger.salvaged_wood, 1);
        assert!(sim.structure(ws).unwrap().as_workshop().unwrap().closing);
    }

    #[test]
    fn test_finish_ships_and_drops_leftovers() {
        let (mut sim, depot) = sim_with_depot();
        let cell = GridPosition::new(12, 10);
        sim.map.add_debris(cell, DebrisKind::Recycling, Resources::default());
        let ws = sim.place_structure(StructureType::Workshop, cell).unwrap();
        let mut s = sim.structures.remove(&ws).unwrap();
        s.present.survivors = 1;
        s.servicer = Some(depot);
        if let StructureKind::Workshop(w) = &mut s.kind {
            w.collected = Resources::new(2, 15, 0);
        }
        sim.finish_workshop(&mut s);

        assert_eq!(sim.couriers.len(), 1);
        assert_eq!(sim.couriers.values().next().unwrap().cargo.wood, 10);
        assert_eq!(sim.map.cargo_at(cell).map(|c| c.wood), Some(5));
        assert_eq!(sim.civilians.len(), 2);
        assert!(sim.map.debris_at(cell).is_none());
        assert!(s.is_destroyed());
    }

    #[test]
    fn test_depot_retreat_walks_to_other_depot() {
        let (mut sim, first) = sim_with_depot();
        let second = sim.place_structure(StructureType::Depot, GridPosition::new(14, 10)).unwrap();
        sim.retreat(first).unwrap();
        assert!(sim.structure(first).is_none());
        assert_eq!(sim.civilians.len(), 5);
        assert!(sim.civilians.values().all(|c| c.destination == Some(second)));
        let cargo = sim.map.cargo_at(GridPosition::new(10, 10)).unwrap();
        assert_eq!((cargo.wood, cargo.bullets), (50, 50));
    }

    #[test]
    fn test_outpost_retreat_near_depot_trucks_goods_home() {
        let (mut sim, depot) = sim_with_depot();
        let outpost = sim.place_structure(StructureType::Outpost, GridPosition::new(12, 10)).unwrap();
        sim.structures.get_mut(&outpost).unwrap().present = Resources::new(3, 0, 25);
        sim.retreat(outpost).unwrap();

        assert_eq!(sim.couriers.len(), 3);
        assert!(sim.couriers.values().all(|c| c.destination == depot));
        let carried: u32 = sim.couriers.values().map(|c| c.cargo.bullets).sum();
        assert_eq!(carried, 25);
        assert!(sim.civilians.is_empty());
    }

    #[test]
    fn test_guarded_ruin_workshop_binding() {
        let (mut sim, _) = sim_with_depot();
        let rid = sim.map.add_ruin(GridPosition::new(14, 12), DoorSide::South, Resources::new(0, 3, 0), 1);
        let door = sim.map.ruins[&rid].door;
        let ws = sim.place_structure(StructureType::Workshop, door).unwrap();
        assert_eq!(sim.map.ruins[&rid].workshop, Some(ws));
        sim.retreat(ws).unwrap();
        assert_eq!(sim.map.ruins[&rid].workshop, None);
    }
}
