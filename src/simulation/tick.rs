//! Fixed-order tick scheduler and win/loss evaluation

use rand::seq::SliceRandom;

use crate::core::types::{BridgeId, GridPosition};
use crate::simulation::events::SimEventKind;
use crate::simulation::noise::NoiseLevel;
use crate::simulation::state::Simulation;

impl Simulation {
    // ===== DRIVER =====

    /// Advance by a wall-clock delta scaled by the time speed
    ///
    /// The scaled delta is split into equal sub-steps no longer than
    /// `max_substep`, so 10× speed runs the same logic as 1× speed.
    /// Returns the number of sub-steps taken.
    pub fn update(&mut self, wall_dt: f32) -> u32 {
        let scaled = wall_dt * self.time_speed.multiplier();
        if scaled <= 0.0 || self.is_over() {
            return 0;
        }
        let steps = ((scaled / self.config.max_substep).ceil() as u32).max(1);
        let dt = scaled / steps as f32;
        let mut taken = 0;
        for _ in 0..steps {
            if self.is_over() {
                break;
            }
            self.step(dt);
            taken += 1;
        }
        taken
    }

    /// One simulation step of `dt` simulated seconds
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed += dt;

        self.update_round_timer(dt);
        self.update_hostiles(dt);
        self.update_couriers(dt);
        self.update_civilians(dt);
        self.update_structures(dt);
        self.update_camps(dt);
        self.check_game_over();
    }

    // ===== ROUNDS =====

    fn update_round_timer(&mut self, dt: f32) {
        self.round_timer -= dt;
        if self.round_timer > 0.0 {
            return;
        }
        self.round_timer = self.config.round_duration;
        self.spawn_wave();
    }

    /// Spawn a scripted wave at a random functional bridge
    pub fn spawn_wave(&mut self) -> Option<BridgeId> {
        let bridges: Vec<(BridgeId, GridPosition)> = self
            .map
            .functional_bridges()
            .filter_map(|b| b.first_cell().map(|cell| (b.id, cell)))
            .collect();
        let (bridge, anchor) = *bridges.choose(&mut self.rng)?;

        let count = self.config.wave_size;
        for i in 0..count as i32 {
            let cell = anchor.offset(i % 3 - 1, i / 3 - 1);
            let cell = if self.map.is_passable(cell) { cell } else { anchor };
            self.spawn_wave_hostile(cell);
        }
        tracing::info!("Wave of {} hostiles crossed bridge {:?} at {}", count, bridge, anchor);
        self.push_event(SimEventKind::WaveSpawned { bridge, count });
        Some(bridge)
    }

    // ===== CAMPS =====

    fn update_camps(&mut self, dt: f32) {
        let interval = self.config.camp_noise_interval;
        let (base, per_survivor, max) = (
            self.config.camp_noise_base_chance,
            self.config.camp_noise_per_survivor,
            self.config.camp_noise_max_chance,
        );

        let mut rolls = Vec::new();
        for camp in self.map.camps.values_mut() {
            camp.noise_timer += dt;
            if camp.noise_timer >= interval {
                camp.noise_timer -= interval;
                rolls.push((camp.cell, camp.noise_chance(base, per_survivor, max)));
            }
        }
        for (cell, chance) in rolls {
            if self.roll(chance) {
                self.emit_noise(cell, NoiseLevel::Medium);
            }
        }
    }

    // ===== GAME OVER =====

    /// Evaluate victory and defeat; the event fires at most once
    pub fn check_game_over(&mut self) -> Option<bool> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        let victory = !self.map.bridges.is_empty() && self.map.functional_bridges().next().is_none();
        let defeat = self.base_established && self.live_depots().next().is_none();
        if !victory && !defeat {
            return None;
        }

        self.outcome = Some(victory);
        tracing::info!(
            "Game over after {:.1}s: {}",
            self.elapsed,
            if victory { "victory" } else { "defeat" }
        );
        self.push_event(SimEventKind::GameOver { victory });
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::BalanceConfig;
    use crate::core::types::GridPosition;
    use crate::economy::structure::StructureType;
    use crate::simulation::commands::TimeSpeed;
    use crate::simulation::events::SimEventKind;
    use crate::simulation::state::Simulation;
    use crate::world::grid::{GameMap, TileKind};

    fn river_map() -> GameMap {
        let mut map = GameMap::new(32, 32);
        for y in 0..32 {
            map.set_tile(GridPosition::new(16, y), TileKind::Water);
        }
        map.add_bridge(GridPosition::new(16, 20), GridPosition::new(16, 20));
        map
    }

    #[test]
    fn test_substeps_cover_scaled_delta() {
        let mut sim = Simulation::new(GameMap::new(16, 16), BalanceConfig::default(), 1);
        sim.time_speed = TimeSpeed::Ten;
        let steps = sim.update(0.1);
        assert!((10..=11).contains(&steps));
        assert!((sim.elapsed - 1.0).abs() < 1e-4);

        sim.time_speed = TimeSpeed::Paused;
        assert_eq!(sim.update(1.0), 0);
    }

    #[test]
    fn test_round_timer_spawns_wave_and_resets() {
        let mut sim = Simulation::new(river_map(), BalanceConfig::default(), 3);
        sim.round_timer = 0.05;
        sim.step(0.1);
        assert_eq!(sim.hostiles.len(), 10);
        assert_eq!(sim.round_timer, sim.config.round_duration);
        let near = GridPosition::new(16, 20);
        assert!(sim.hostiles.values().all(|h| h.cell().manhattan(&near) <= 3));
    }

    #[test]
    fn test_victory_fires_once() {
        let mut sim = Simulation::new(river_map(), BalanceConfig::default(), 3);
        let bridge = *sim.map.bridges.keys().next().unwrap();
        sim.map.destroy_bridge(bridge);
        assert_eq!(sim.check_game_over(), Some(true));
        assert_eq!(sim.check_game_over(), Some(true));
        sim.step(0.1);
        let overs = sim
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e.kind, SimEventKind::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_losing_last_depot_is_defeat() {
        let mut sim = Simulation::new(GameMap::new(16, 16), BalanceConfig::default(), 3);
        assert_eq!(sim.check_game_over(), None);
        let depot = sim.place_structure(StructureType::Depot, GridPosition::new(4, 4)).unwrap();
        sim.retreat(depot).unwrap();
        assert_eq!(sim.check_game_over(), Some(false));
    }
}
