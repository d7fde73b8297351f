//! Hostile: noise-driven aggressor
//!
//! `Idle → Moving → Attacking → Idle`. Wave hostiles carry a fixed depot
//! target and ignore noise while that target is alive.

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPosition, StructureId, UnitId};
use crate::simulation::noise::NoiseLevel;
use crate::units::movement::{PathFollower, UnitState};
use crate::world::grid::GameMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostileState {
    Idle,
    Moving,
    Attacking,
}

/// What a hostile is currently hitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackTarget {
    Structure(StructureId),
    Camp(GridPosition),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostile {
    pub id: UnitId,
    pub mover: PathFollower,
    pub state: HostileState,
    pub alert: NoiseLevel,
    pub alert_source: Option<GridPosition>,
    /// Spawned by a timed wave
    pub wave: bool,
    pub fixed_target: Option<StructureId>,
    pub attack: Option<AttackTarget>,
    pub attack_timer: f32,
}

impl Hostile {
    pub fn new(id: UnitId, cell: GridPosition) -> Self {
        Self {
            id,
            mover: PathFollower::at(cell),
            state: HostileState::Idle,
            alert: NoiseLevel::None,
            alert_source: None,
            wave: false,
            fixed_target: None,
            attack: None,
            attack_timer: 0.0,
        }
    }

    pub fn new_wave(id: UnitId, cell: GridPosition) -> Self {
        Self { wave: true, ..Self::new(id, cell) }
    }

    pub fn cell(&self) -> GridPosition {
        self.mover.cell()
    }

    pub fn unit_state(&self) -> UnitState {
        match self.state {
            HostileState::Idle => UnitState::Idle,
            HostileState::Moving => UnitState::Moving,
            HostileState::Attacking => UnitState::Attacking,
        }
    }

    /// React to a noise heard at `source`
    ///
    /// Only a strictly louder noise overrides an active alert, unless the
    /// hostile is idle. A wave hostile with a live target ignores noise.
    /// Returns true if the hostile is now heading for the noise.
    pub fn respond_to_noise(&mut self, map: &GameMap, source: GridPosition, level: NoiseLevel, fixed_target_alive: bool) -> bool {
        if self.wave && fixed_target_alive {
            return false;
        }
        if self.state == HostileState::Attacking {
            return false;
        }
        if self.state != HostileState::Idle && level <= self.alert {
            return false;
        }
        if !self.mover.route_to(map, source) {
            return false;
        }
        self.alert = level;
        self.alert_source = Some(source);
        self.state = HostileState::Moving;
        true
    }

    /// Head for a wave target depot
    pub fn hunt(&mut self, map: &GameMap, target: StructureId, cell: GridPosition) -> bool {
        self.fixed_target = Some(target);
        if self.mover.route_to(map, cell) {
            self.state = HostileState::Moving;
            self.alert_source = Some(cell);
            return true;
        }
        false
    }

    pub fn start_attack(&mut self, target: AttackTarget) {
        self.state = HostileState::Attacking;
        self.attack = Some(target);
        self.attack_timer = 0.0;
        self.mover.clear();
    }

    /// Drop any alert and wait for the next noise
    pub fn become_idle(&mut self) {
        self.state = HostileState::Idle;
        self.alert = NoiseLevel::None;
        self.alert_source = None;
        self.attack = None;
        self.attack_timer = 0.0;
        self.mover.clear();
    }

    /// Accumulate attack time; returns the number of hits due
    pub fn tick_attack(&mut self, dt: f32, interval: f32) -> u32 {
        self.attack_timer += dt;
        let mut hits = 0;
        while self.attack_timer >= interval {
            self.attack_timer -= interval;
            hits += 1;
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_hostile_responds_to_any_noise() {
        let map = GameMap::new(20, 20);
        let mut h = Hostile::new(UnitId(0), GridPosition::new(5, 5));
        assert!(h.respond_to_noise(&map, GridPosition::new(6, 5), NoiseLevel::Low, false));
        assert_eq!(h.state, HostileState::Moving);
        assert_eq!(h.alert, NoiseLevel::Low);
    }

    #[test]
    fn test_only_louder_noise_overrides() {
        let map = GameMap::new(20, 20);
        let mut h = Hostile::new(UnitId(0), GridPosition::new(5, 5));
        assert!(h.respond_to_noise(&map, GridPosition::new(9, 5), NoiseLevel::Medium, false));
        assert!(!h.respond_to_noise(&map, GridPosition::new(1, 5), NoiseLevel::Medium, false));
        assert!(!h.respond_to_noise(&map, GridPosition::new(1, 5), NoiseLevel::Low, false));
        assert_eq!(h.alert_source, Some(GridPosition::new(9, 5)));
        assert!(h.respond_to_noise(&map, GridPosition::new(1, 5), NoiseLevel::High, false));
        assert_eq!(h.alert_source, Some(GridPosition::new(1, 5)));
    }

    #[test]
    fn test_wave_hostile_ignores_noise_while_target_lives() {
        let map = GameMap::new(20, 20);
        let mut h = Hostile::new_wave(UnitId(0), GridPosition::new(5, 5));
        assert!(!h.respond_to_noise(&map, GridPosition::new(6, 5), NoiseLevel::High, true));
        assert!(h.respond_to_noise(&map, GridPosition::new(6, 5), NoiseLevel::High, false));
    }

    #[test]
    fn test_attack_interval() {
        let mut h = Hostile::new(UnitId(0), GridPosition::new(0, 0));
        h.start_attack(AttackTarget::Camp(GridPosition::new(0, 0)));
        assert_eq!(h.tick_attack(0.05, 0.1), 0);
        assert_eq!(h.tick_attack(0.3, 0.1), 3);
        assert_eq!(h.unit_state(), UnitState::Attacking);
    }
}
