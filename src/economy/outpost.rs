//! Outpost: ranged defence that must be built with wood before it fires

use serde::{Deserialize, Serialize};

use crate::core::config::BalanceConfig;
use crate::economy::resources::{Quotas, Resources};

/// Outpost payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outpost {
    pub construction_wood: u32,
    pub upgrade_level: u32,
    pub upgrade_pending: bool,
    pub extra_range: u32,
    pub hold_fire: bool,
    pub fire_timer: f32,
}

impl Outpost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already constructed, as seeded by a level
    pub fn built(config: &BalanceConfig) -> Self {
        Self {
            construction_wood: config.outpost_construction_cost,
            ..Self::default()
        }
    }

    pub fn is_built(&self, config: &BalanceConfig) -> bool {
        self.construction_wood >= config.outpost_construction_cost
    }

    pub fn range(&self, config: &BalanceConfig) -> u32 {
        config.outpost_base_range + self.extra_range
    }

    /// Hit probability: `min(survivors, max) / max`
    pub fn accuracy(survivors: u32, config: &BalanceConfig) -> f64 {
        let max = config.outpost_max_survivors.max(1);
        survivors.min(max) as f64 / max as f64
    }

    pub fn can_fire(&self, present: &Resources, config: &BalanceConfig) -> bool {
        self.is_built(config) && present.bullets > 0 && present.survivors > 0 && !self.hold_fire
    }

    /// Advance the fire cooldown; true when a shot is due
    pub fn tick_fire(&mut self, dt: f32, interval: f32) -> bool {
        self.fire_timer += dt;
        if self.fire_timer >= interval {
            self.fire_timer = 0.0;
            return true;
        }
        false
    }

    /// Wood goes to construction first, then to a pending upgrade
    pub fn receive_wood(&mut self, amount: u32, present: &mut Resources, quotas: &mut Quotas, config: &BalanceConfig) {
        let mut amount = amount;
        if !self.is_built(config) {
            let needed = config.outpost_construction_cost - self.construction_wood;
            let used = amount.min(needed);
            self.construction_wood += used;
            amount -= used;
            if self.is_built(config) {
                quotas.wood = 0;
            }
        }
        present.wood += amount;
        if self.upgrade_pending && present.wood >= config.outpost_upgrade_cost {
            present.wood -= config.outpost_upgrade_cost;
            self.upgrade_level += 1;
            self.extra_range += config.outpost_upgrade_range;
            self.upgrade_pending = false;
            quotas.wood = 0;
        }
    }

    /// Ask for an upgrade; returns false when maxed or already pending
    pub fn request_upgrade(&mut self, quotas: &mut Quotas, config: &BalanceConfig) -> bool {
        if self.upgrade_level >= config.outpost_max_upgrades || self.upgrade_pending {
            return false;
        }
        self.upgrade_pending = true;
        quotas.wood = config.outpost_upgrade_cost;
        true
    }
}
