//! Balance configuration with documented constants
//!
//! Every tunable number of the simulation lives here. Values can be
//! overridden from a TOML file; missing keys fall back to the defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ColonyError, Result};
use crate::economy::resources::Quotas;

/// Configuration for the colony simulation
///
/// The defaults reproduce the shipped balance of the standard level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    // === WORLD ===
    /// Map width in cells
    pub map_width: i32,
    /// Map height in cells
    pub map_height: i32,
    /// Largest simulated step (seconds) applied in one piece
    ///
    /// Larger scaled deltas are split so that movement and timers never
    /// jump past a waypoint or a cooldown at high time-speed multipliers.
    pub max_substep: f32,

    // === ROUNDS ===
    /// Seconds between scripted hostile waves
    pub round_duration: f32,
    /// Hostiles spawned near a bridge per wave
    pub wave_size: u32,

    // === DEPOTS ===
    /// Manhattan radius in which a depot services structures and allows placement
    pub depot_service_radius: u32,
    /// Manhattan radius in which depots resupply each other from surplus
    pub sibling_depot_radius: u32,
    /// Seconds between dispatch attempts
    pub dispatch_interval: f32,
    /// Maximum wood or bullets carried by one courier
    pub truck_capacity: u32,
    /// Stock granted to the first depot placed before any base exists
    pub free_depot_stock: Quotas,
    /// Lifetime of a boost prioritization in seconds
    pub prioritization_duration: f32,

    // === WORKSHOPS ===
    /// Collections per second with a single worker
    pub workshop_base_rate: f32,
    /// Multiplicative rate gain per extra worker
    pub workshop_rate_growth: f32,
    /// Collected units between medium noise events
    pub workshop_noise_threshold: u32,
    /// Upper bound on couriers shipped per second
    pub workshop_trucks_per_second: f32,
    /// Seconds between target exhaustion and close-out
    pub workshop_closeout_delay: f32,
    /// Collection ticks needed to detonate a demolition charge
    pub demolition_charges: u32,
    /// Wood-equivalent ticks needed to clear rubble
    pub rubble_clear_amount: u32,
    /// Bridge tiles within this distance of a charge are linked to it
    pub demolition_link_radius: u32,

    // === OUTPOSTS ===
    /// Base firing range in cells
    pub outpost_base_range: u32,
    /// Range added per upgrade level
    pub outpost_upgrade_range: u32,
    /// Maximum upgrade levels
    pub outpost_max_upgrades: u32,
    /// Wood consumed per upgrade level
    pub outpost_upgrade_cost: u32,
    /// Wood required before the outpost can fire
    pub outpost_construction_cost: u32,
    /// Survivor count at which accuracy reaches 100%
    pub outpost_max_survivors: u32,
    /// Seconds between shots
    pub outpost_fire_interval: f32,
    /// Bullets above quota that trigger a return shipment
    pub outpost_bullet_excess: u32,

    // === UNITS ===
    /// Courier speed in cells per second
    pub courier_speed: f32,
    /// Civilian speed in cells per second
    pub civilian_speed: f32,
    /// Hostile speed in cells per second
    pub hostile_speed: f32,
    /// Seconds between hostile attack hits
    pub hostile_attack_interval: f32,
    /// Distance (cells) at which a unit snaps onto its waypoint
    pub waypoint_tolerance: f32,
    /// Chance a unit with a vanished destination picks another depot
    pub retarget_chance: f64,
    /// Cells a lost unit wanders toward its old destination
    pub wander_distance: i32,
    /// Manhattan radius considered safe for retreating structures
    pub retreat_safe_radius: u32,

    // === CAMPS ===
    /// Seconds between camp noise rolls
    pub camp_noise_interval: f32,
    /// Camp noise chance with no survivors
    pub camp_noise_base_chance: f64,
    /// Added camp noise chance per sheltered survivor
    pub camp_noise_per_survivor: f64,
    /// Camp noise chance ceiling
    pub camp_noise_max_chance: f64,

    // === INITIAL QUOTAS ===
    pub depot_quotas: Quotas,
    pub workshop_quotas: Quotas,
    pub outpost_quotas: Quotas,
    pub wall_quotas: Quotas,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            map_width: 64,
            map_height: 64,
            max_substep: 0.1,

            round_duration: 180.0,
            wave_size: 10,

            depot_service_radius: 8,
            sibling_depot_radius: 8,
            dispatch_interval: 0.5,
            truck_capacity: 10,
            free_depot_stock: Quotas::new(5, 50, 50),
            prioritization_duration: 30.0,

            workshop_base_rate: 1.0,
            workshop_rate_growth: 1.35,
            workshop_noise_threshold: 20,
            workshop_trucks_per_second: 5.0,
            workshop_closeout_delay: 1.0,
            demolition_charges: 200,
            rubble_clear_amount: 20,
            demolition_link_radius: 2,

            outpost_base_range: 8,
            outpost_upgrade_range: 8,
            outpost_max_upgrades: 2,
            outpost_upgrade_cost: 20,
            outpost_construction_cost: 20,
            outpost_max_survivors: 11,
            outpost_fire_interval: 1.0,
            outpost_bullet_excess: 10,

            courier_speed: 2.0,
            civilian_speed: 2.0,
            hostile_speed: 1.5,
            hostile_attack_interval: 0.1,
            waypoint_tolerance: 0.125,
            retarget_chance: 0.5,
            wander_distance: 4,
            retreat_safe_radius: 8,

            camp_noise_interval: 2.0,
            camp_noise_base_chance: 0.10,
            camp_noise_per_survivor: 0.025,
            camp_noise_max_chance: 0.8,

            depot_quotas: Quotas::new(0, 0, 0),
            workshop_quotas: Quotas::new(1, 0, 0),
            outpost_quotas: Quotas::new(1, 20, 50),
            wall_quotas: Quotas::new(0, 10, 0),
        }
    }
}

impl BalanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BalanceConfig = toml::from_str(content)?;
        config.validate().map_err(ColonyError::Config)?;
        Ok(config)
    }

    /// Load and validate a balance file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate that values are internally consistent
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(format!(
                "Map dimensions must be positive, got {}x{}",
                self.map_width, self.map_height
            ));
        }
        if self.max_substep <= 0.0 {
            return Err("max_substep must be positive".into());
        }
        if self.dispatch_interval <= 0.0 || self.outpost_fire_interval <= 0.0 {
            return Err("Intervals must be positive".into());
        }
        if self.hostile_attack_interval <= 0.0 || self.camp_noise_interval <= 0.0 {
            return Err("Intervals must be positive".into());
        }
        if self.truck_capacity == 0 {
            return Err("truck_capacity must be at least 1".into());
        }
        if self.workshop_trucks_per_second <= 0.0 {
            return Err("workshop_trucks_per_second must be positive".into());
        }
        if self.courier_speed <= 0.0 || self.civilian_speed <= 0.0 || self.hostile_speed <= 0.0 {
            return Err("Unit speeds must be positive".into());
        }
        if self.waypoint_tolerance <= 0.0 || self.waypoint_tolerance >= 0.5 {
            return Err(format!(
                "waypoint_tolerance ({}) must be in (0, 0.5)",
                self.waypoint_tolerance
            ));
        }
        if self.outpost_max_survivors == 0 {
            return Err("outpost_max_survivors must be at least 1".into());
        }
        for (name, p) in [
            ("retarget_chance", self.retarget_chance),
            ("camp_noise_base_chance", self.camp_noise_base_chance),
            ("camp_noise_max_chance", self.camp_noise_max_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{} ({}) must be a probability", name, p));
            }
        }
        if self.wander_distance < 1 {
            return Err("wander_distance must be at least 1".into());
        }
        Ok(())
    }

    /// Interval between workshop courier departures
    pub fn workshop_truck_interval(&self) -> f32 {
        1.0 / self.workshop_trucks_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BalanceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BalanceConfig::from_toml_str(
            r#"
            round_duration = 60.0
            wave_size = 4

            [free_depot_stock]
            survivors = 9
            wood = 0
            bullets = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.round_duration, 60.0);
        assert_eq!(config.wave_size, 4);
        assert_eq!(config.free_depot_stock.survivors, 9);
        assert_eq!(config.truck_capacity, 10);
        assert_eq!(config.outpost_max_survivors, 11);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let result = BalanceConfig::from_toml_str("waypoint_tolerance = 0.75");
        assert!(matches!(result, Err(ColonyError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let result = BalanceConfig::from_toml_str("round_duration = \"soon\"");
        assert!(matches!(result, Err(ColonyError::TomlError(_))));
    }
}
