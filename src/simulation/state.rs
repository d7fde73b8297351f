//! Simulation aggregate root
//!
//! Owns the map, every registry and the single seeded random source.
//! Registries are keyed by sequential ids in `BTreeMap`s, so iteration
//! order and therefore every replay with the same seed is deterministic.
//! Player commands are applied between ticks through [`Simulation::apply`].

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::BalanceConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::types::{GridPosition, IdCounter, StructureId, Tick, UnitId};
use crate::economy::depot::{Prioritization, PrioritizationMode};
use crate::economy::outpost::Outpost;
use crate::economy::resources::{ResourceKind, Resources};
use crate::economy::structure::{Structure, StructureKind, StructureType};
use crate::economy::workshop::WorkshopTarget;
use crate::simulation::commands::{Command, CommandOutcome, PrioritizationChange, TimeSpeed};
use crate::simulation::events::{EventLog, SimEvent, SimEventKind};
use crate::simulation::noise::NoiseLevel;
use crate::units::{Civilian, Courier, Hostile, UnitKind};
use crate::world::grid::GameMap;
use crate::world::level::{DepotSeed, Level, LevelKind, OutpostSeed};
use crate::world::placement::{self, PlacementOutcome};

/// Goods that left the colony without being stored anywhere, plus the
/// one source that creates goods (rubble salvage)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub bullets_fired: u32,
    /// Wood consumed by outpost upgrades or lost with an unfinished outpost
    pub wood_spent: u32,
    /// Wood knocked off walls by hostiles
    pub wall_damage: u32,
    /// Survivors turned into hostiles
    pub survivors_lost: u32,
    /// Wood recovered from clearing rubble
    pub salvaged_wood: u32,
}

impl Ledger {
    pub fn sinks(&self) -> Resources {
        Resources::new(
            self.survivors_lost,
            self.wood_spent + self.wall_damage,
            self.bullets_fired,
        )
    }
}

/// The whole simulated game
#[derive(Debug, Clone)]
pub struct Simulation {
    pub config: BalanceConfig,
    pub map: GameMap,
    pub structures: BTreeMap<StructureId, Structure>,
    pub couriers: BTreeMap<UnitId, Courier>,
    pub hostiles: BTreeMap<UnitId, Hostile>,
    pub civilians: BTreeMap<UnitId, Civilian>,
    pub time_speed: TimeSpeed,
    /// Seconds until the next scripted wave
    pub round_timer: f32,
    pub tick: Tick,
    /// Simulated seconds so far
    pub elapsed: f32,
    /// A depot has existed; defeat is possible from now on
    pub base_established: bool,
    /// `Some(victory)` once the game has ended
    pub outcome: Option<bool>,
    pub ledger: Ledger,
    pub(crate) events: EventLog,
    pub(crate) rng: ChaCha8Rng,
    structure_ids: IdCounter,
    unit_ids: IdCounter,
}

impl Simulation {
    /// Empty simulation over an existing map
    pub fn new(map: GameMap, config: BalanceConfig, seed: u64) -> Self {
        Self {
            round_timer: config.round_duration,
            config,
            map,
            structures: BTreeMap::new(),
            couriers: BTreeMap::new(),
            hostiles: BTreeMap::new(),
            civilians: BTreeMap::new(),
            time_speed: TimeSpeed::Normal,
            tick: 0,
            elapsed: 0.0,
            base_established: false,
            outcome: None,
            ledger: Ledger::default(),
            events: EventLog::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            structure_ids: IdCounter::new(),
            unit_ids: IdCounter::new(),
        }
    }

    /// Build a level with the simulation's own random source and install its population
    pub fn from_level(kind: LevelKind, config: BalanceConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let Level { map, depots, outposts, hostiles } = Level::build(kind, &config, &mut rng);
        let mut sim = Self::new(map, config, seed);
        sim.rng = rng;
        sim.install(depots, outposts, hostiles);
        tracing::info!(
            "Level {:?} ready: {} structures, {} hostiles, {} ruins",
            kind,
            sim.structures.len(),
            sim.hostiles.len(),
            sim.map.ruins.len()
        );
        sim
    }

    fn install(&mut self, depots: Vec<DepotSeed>, outposts: Vec<OutpostSeed>, hostiles: Vec<GridPosition>) {
        for seed in depots {
            let id = self.next_structure_id();
            let mut depot = Structure::new_depot(id, seed.cell, &self.config);
            depot.present = seed.stock;
            depot.quotas = seed.quotas;
            if let Some(d) = depot.as_depot_mut() {
                d.ever_stocked = !seed.stock.is_empty();
            }
            self.base_established = true;
            self.insert_structure(depot);
        }
        for seed in outposts {
            let id = self.next_structure_id();
            let mut quotas = self.config.outpost_quotas;
            quotas.wood = 0;
            let mut outpost = Structure::new(id, seed.cell, StructureKind::Outpost(Outpost::built(&self.config)), quotas);
            outpost.present = seed.present;
            outpost.servicer = self.pick_servicer(seed.cell, id);
            self.insert_structure(outpost);
        }
        for cell in hostiles {
            self.spawn_hostile(cell);
        }
    }

    // ===== QUERIES =====

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every event buffered since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn is_structure_alive(&self, id: StructureId) -> bool {
        self.structures.get(&id).map(|s| !s.is_destroyed()).unwrap_or(false)
    }

    pub fn is_live_depot(&self, id: StructureId) -> bool {
        self.structures
            .get(&id)
            .map(|s| s.is_depot() && !s.is_destroyed())
            .unwrap_or(false)
    }

    pub fn live_depots(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values().filter(|s| s.is_depot() && !s.is_destroyed())
    }

    pub fn live_depot_cells(&self) -> Vec<GridPosition> {
        self.live_depots().map(|s| s.cell).collect()
    }

    /// Closest live depot by Manhattan distance, ties to the lowest id
    pub fn nearest_depot(&self, cell: GridPosition, exclude: Option<StructureId>) -> Option<(StructureId, GridPosition)> {
        self.live_depots()
            .filter(|s| Some(s.id) != exclude)
            .min_by_key(|s| (s.cell.manhattan(&cell), s.id))
            .map(|s| (s.id, s.cell))
    }

    /// Everything held by the colony: structures, couriers and civilians
    pub fn colony_holdings(&self) -> Resources {
        let mut total = Resources::default();
        for s in self.structures.values() {
            total.merge(s.holdings());
        }
        for c in self.couriers.values() {
            total.merge(c.holdings());
        }
        total.survivors += self.civilians.len() as u32;
        total
    }

    /// Goods still out in the world: ruins, camps, debris and dropped cargo
    pub fn world_goods(&self) -> Resources {
        let mut total = self.map.loose_goods();
        for ruin in self.map.ruins.values() {
            total.merge(ruin.goods);
        }
        total
    }

    /// Colony holdings plus world goods plus sinks, minus salvage
    ///
    /// Constant over any run: goods only ever move between these buckets.
    pub fn accounted_goods(&self) -> Resources {
        let mut total = self.colony_holdings() + self.world_goods() + self.ledger.sinks();
        total.wood = total.wood.saturating_sub(self.ledger.salvaged_wood);
        total
    }

    /// Dry-run placement check; never mutates
    pub fn validate_placement(&self, kind: StructureType, cell: GridPosition) -> PlacementOutcome {
        placement::validate_placement(
            &self.map,
            kind,
            cell,
            &self.live_depot_cells(),
            self.config.depot_service_radius,
            self.config.demolition_link_radius,
        )
    }

    // ===== COMMANDS =====

    /// Apply a player command synchronously
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        let result = self.apply_command(&command);
        if let Err(err) = &result {
            tracing::warn!("Rejected {:?}: {}", command, err);
        }
        result
    }

    fn apply_command(&mut self, command: &Command) -> Result<CommandOutcome> {
        match *command {
            Command::SetTimeSpeed { speed } => {
                self.time_speed = speed;
                return Ok(CommandOutcome::Applied);
            }
            // Overlays are presentation only
            Command::ToggleOverlay { .. } => return Ok(CommandOutcome::Applied),
            _ => {}
        }
        if self.is_over() {
            return Err(ColonyError::GameOver);
        }

        match *command {
            Command::PlaceStructure { structure, cell } => {
                self.place_structure(structure, cell).map(CommandOutcome::Placed)
            }
            Command::AdjustQuota { id, resource, delta } => {
                self.structure_mut(id)?.adjust_quota(resource, delta);
                Ok(CommandOutcome::Applied)
            }
            Command::Retreat { id } => {
                self.retreat(id)?;
                Ok(CommandOutcome::Applied)
            }
            Command::UpgradeOutpost { id } => {
                let config = &self.config;
                let s = self.structures.get_mut(&id).ok_or(ColonyError::StructureNotFound(id))?;
                let StructureKind::Outpost(outpost) = &mut s.kind else {
                    return Err(not_an(id, "an outpost"));
                };
                if !outpost.request_upgrade(&mut s.quotas, config) {
                    return Err(ColonyError::InvalidCommand(format!("{:?} cannot be upgraded further", id)));
                }
                Ok(CommandOutcome::Applied)
            }
            Command::SetHoldFire { id, hold } => {
                let outpost = self.structure_mut(id)?.as_outpost_mut().ok_or_else(|| not_an(id, "an outpost"))?;
                outpost.hold_fire = hold;
                Ok(CommandOutcome::Applied)
            }
            Command::WarningShot { id } => {
                self.warning_shot(id)?;
                Ok(CommandOutcome::Applied)
            }
            Command::Prioritize { depot, change } => {
                self.prioritize(depot, change)?;
                Ok(CommandOutcome::Applied)
            }
            Command::SetTimeSpeed { .. } | Command::ToggleOverlay { .. } => Ok(CommandOutcome::Applied),
        }
    }

    fn structure_mut(&mut self, id: StructureId) -> Result<&mut Structure> {
        self.structures.get_mut(&id).ok_or(ColonyError::StructureNotFound(id))
    }

    /// Validate and build a structure
    pub fn place_structure(&mut self, kind: StructureType, cell: GridPosition) -> Result<StructureId> {
        let outcome = self.validate_placement(kind, cell);
        if !outcome.is_ok() {
            return Err(ColonyError::Placement(outcome));
        }

        let id = self.next_structure_id();
        let mut structure = match kind {
            StructureType::Depot => Structure::new_depot(id, cell, &self.config),
            StructureType::Workshop => {
                let target = placement::workshop_target_at(&self.map, cell, self.config.demolition_link_radius)
                    .map_err(ColonyError::Placement)?;
                if let WorkshopTarget::Ruin(ruin) = target {
                    if let Some(ruin) = self.map.ruins.get_mut(&ruin) {
                        ruin.workshop = Some(id);
                    }
                }
                Structure::new_workshop(id, cell, target, &self.config)
            }
            StructureType::Outpost => Structure::new_outpost(id, cell, &self.config),
            StructureType::Wall => Structure::new_wall(id, cell, &self.config),
        };

        if kind == StructureType::Depot && !self.base_established {
            let stock = self.config.free_depot_stock;
            structure.present = stock;
            if let Some(depot) = structure.as_depot_mut() {
                depot.ever_stocked = !stock.is_empty();
            }
            self.base_established = true;
        }
        if kind != StructureType::Depot {
            structure.servicer = self.pick_servicer(cell, id);
        }

        self.insert_structure(structure);
        if kind == StructureType::Depot {
            self.refresh_wave_targets();
        }
        Ok(id)
    }

    fn warning_shot(&mut self, id: StructureId) -> Result<()> {
        let s = self.structure_mut(id)?;
        if s.as_outpost().is_none() {
            return Err(not_an(id, "an outpost"));
        }
        if s.present.take(ResourceKind::Bullets, 1) == 0 {
            return Err(ColonyError::InvalidCommand(format!("{:?} has no bullets", id)));
        }
        let cell = s.cell;
        self.ledger.bullets_fired += 1;
        self.emit_noise(cell, NoiseLevel::High);
        self.push_event(SimEventKind::ShotFired { from: cell, to: None, hit: false });
        Ok(())
    }

    fn prioritize(&mut self, depot: StructureId, change: PrioritizationChange) -> Result<()> {
        if let PrioritizationChange::Add { target, .. } = change {
            if !self.structures.contains_key(&target) {
                return Err(ColonyError::StructureNotFound(target));
            }
        }
        let duration = self.config.prioritization_duration;
        let d = self.structure_mut(depot)?.as_depot_mut().ok_or_else(|| not_an(depot, "a depot"))?;
        match change {
            PrioritizationChange::Add { target, mode, flow_percent, direction } => {
                d.add_prioritization(Prioritization {
                    target,
                    mode,
                    flow_percent: flow_percent.min(100),
                    direction,
                    time_remaining: match mode {
                        PrioritizationMode::Boost => Some(duration),
                        PrioritizationMode::HeavyPour => None,
                    },
                });
            }
            PrioritizationChange::RemoveLast => {
                d.remove_last_prioritization();
            }
            PrioritizationChange::Clear => d.clear_prioritizations(),
        }
        Ok(())
    }

    /// Give every wave hostile without a live target the nearest depot
    fn refresh_wave_targets(&mut self) {
        let orders: Vec<(UnitId, StructureId, GridPosition)> = self
            .hostiles
            .values()
            .filter(|h| h.wave && h.attack.is_none())
            .filter(|h| !h.fixed_target.map(|t| self.is_live_depot(t)).unwrap_or(false))
            .filter_map(|h| self.nearest_depot(h.cell(), None).map(|(id, cell)| (h.id, id, cell)))
            .collect();
        for (hid, target, cell) in orders {
            if let Some(h) = self.hostiles.get_mut(&hid) {
                h.hunt(&self.map, target, cell);
            }
        }
    }

    // ===== REGISTRY HELPERS =====

    pub(crate) fn next_structure_id(&mut self) -> StructureId {
        StructureId(self.structure_ids.next_raw())
    }

    pub(crate) fn next_unit_id(&mut self) -> UnitId {
        UnitId(self.unit_ids.next_raw())
    }

    pub(crate) fn push_event(&mut self, kind: SimEventKind) {
        self.events.push(self.tick, kind);
    }

    /// One uniform draw against `chance`
    pub(crate) fn roll(&mut self, chance: f64) -> bool {
        self.rng.gen::<f64>() < chance
    }

    /// Nearest live depot to `cell`, equidistant candidates broken at random
    pub(crate) fn pick_servicer(&mut self, cell: GridPosition, exclude: StructureId) -> Option<StructureId> {
        let mut best: Vec<(u32, StructureId)> = self
            .live_depots()
            .filter(|s| s.id != exclude)
            .map(|s| (s.cell.manhattan(&cell), s.id))
            .collect();
        let nearest = best.iter().map(|(d, _)| *d).min()?;
        best.retain(|(d, _)| *d == nearest);
        best.choose(&mut self.rng).map(|(_, id)| *id)
    }

    pub(crate) fn insert_structure(&mut self, structure: Structure) {
        let (id, cell, kind) = (structure.id, structure.cell, structure.structure_type());
        self.map.attach_structure(cell, id, structure.blocks_movement());
        self.structures.insert(id, structure);
        tracing::debug!("{:?} {:?} placed at {}", kind, id, cell);
        self.push_event(SimEventKind::StructureCreated { id, structure: kind, cell });
    }

    /// Remove a structure from the registry and the map
    pub(crate) fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        let structure = self.structures.remove(&id)?;
        self.retire_structure(&structure);
        Some(structure)
    }

    /// Unhook an already unregistered structure from the map
    pub(crate) fn retire_structure(&mut self, structure: &Structure) {
        self.map.detach_structure(structure.cell, structure.id);
        if let StructureKind::Workshop(w) = &structure.kind {
            if let WorkshopTarget::Ruin(rid) = w.target {
                if let Some(ruin) = self.map.ruins.get_mut(&rid) {
                    if ruin.workshop == Some(structure.id) {
                        ruin.workshop = None;
                    }
                }
            }
        }
        tracing::info!("{:?} {:?} at {} removed", structure.structure_type(), structure.id, structure.cell);
        self.push_event(SimEventKind::StructureDestroyed {
            id: structure.id,
            structure: structure.structure_type(),
            cell: structure.cell,
        });
    }

    pub(crate) fn spawn_hostile(&mut self, cell: GridPosition) -> UnitId {
        let id = self.next_unit_id();
        self.hostiles.insert(id, Hostile::new(id, cell));
        self.unit_spawned(id, UnitKind::Hostile, cell);
        id
    }

    pub(crate) fn spawn_wave_hostile(&mut self, cell: GridPosition) -> UnitId {
        let id = self.next_unit_id();
        let mut hostile = Hostile::new_wave(id, cell);
        if let Some((target, target_cell)) = self.nearest_depot(cell, None) {
            hostile.hunt(&self.map, target, target_cell);
        }
        self.hostiles.insert(id, hostile);
        self.unit_spawned(id, UnitKind::Hostile, cell);
        id
    }

    /// Send a lone survivor on foot; with no destination it is lost on its first update
    pub(crate) fn spawn_civilian(&mut self, cell: GridPosition, destination: Option<StructureId>) -> UnitId {
        let id = self.next_unit_id();
        let mut civilian = Civilian::new(id, cell);
        if let Some(target) = destination.and_then(|d| self.structures.get(&d)) {
            civilian.set_destination(target.id, target.cell, target.is_depot());
            civilian.mover.route_to(&self.map, target.cell);
        }
        self.civilians.insert(id, civilian);
        self.unit_spawned(id, UnitKind::Civilian, cell);
        id
    }

    /// Register a courier built by the caller and route it
    pub(crate) fn spawn_courier(&mut self, mut courier: Courier) -> UnitId {
        let id = courier.id;
        let cell = courier.cell();
        courier.to_depot = self.structures.get(&courier.destination).map(|s| s.is_depot()).unwrap_or(false);
        courier.mover.route_to(&self.map, courier.destination_cell);
        self.couriers.insert(id, courier);
        self.unit_spawned(id, UnitKind::Courier, cell);
        id
    }

    fn unit_spawned(&mut self, id: UnitId, unit: UnitKind, cell: GridPosition) {
        tracing::debug!("{:?} {:?} spawned at {}", unit, id, cell);
        self.push_event(SimEventKind::UnitSpawned { id, unit, cell });
    }

    pub(crate) fn unit_removed(&mut self, id: UnitId, unit: UnitKind, cell: GridPosition) {
        tracing::debug!("{:?} {:?} removed at {}", unit, id, cell);
        self.push_event(SimEventKind::UnitRemoved { id, unit, cell });
    }

    /// Shelter a stranded unit's holdings in a camp
    pub(crate) fn make_camp(&mut self, cell: GridPosition, goods: Resources) {
        if goods.is_empty() {
            return;
        }
        self.map.add_to_camp(cell, goods);
        tracing::debug!("Camp at {} now shelters {}", cell, goods);
        self.push_event(SimEventKind::TileChanged { cell });
    }

    /// Leave wood and bullets on the ground; survivors are ignored
    pub(crate) fn drop_goods(&mut self, cell: GridPosition, goods: Resources) {
        if !goods.has_goods() {
            return;
        }
        self.map.drop_cargo(cell, goods.wood, goods.bullets);
        self.push_event(SimEventKind::TileChanged { cell });
    }

    /// Survivors overrun at `cell` rise again as hostiles
    pub(crate) fn convert_survivors(&mut self, cell: GridPosition, count: u32) {
        for _ in 0..count {
            self.spawn_hostile(cell);
        }
        self.ledger.survivors_lost += count;
    }
}

fn not_an(id: StructureId, what: &str) -> ColonyError {
    ColonyError::InvalidCommand(format!("{:?} is not {}", id, what))
}
