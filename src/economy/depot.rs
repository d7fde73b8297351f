//! Depot: the colony's only resource reservoir
//!
//! Dispatch is planned here as pure functions over two structures; the
//! simulation turns a plan into a walker or a courier.

use serde::{Deserialize, Serialize};

use crate::core::types::StructureId;
use crate::economy::resources::ResourceKind;
use crate::economy::structure::Structure;

/// How a prioritization overrides normal flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrioritizationMode {
    /// Temporary, expires after a fixed duration
    Boost,
    /// Stays until removed
    HeavyPour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    ToTarget,
    ToSource,
}

/// A player-requested flow override from a depot toward one structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prioritization {
    pub target: StructureId,
    pub mode: PrioritizationMode,
    /// Share of flow, 50, 75 or 100
    pub flow_percent: u32,
    pub direction: FlowDirection,
    /// None for heavy pour
    pub time_remaining: Option<f32>,
}

/// Depot payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Depot {
    pub dispatch_timer: f32,
    pub prioritizations: Vec<Prioritization>,
    /// Set only when a retreat moved the population to another depot
    pub abandoned: bool,
    /// Set the first time the depot held anything
    pub ever_stocked: bool,
}

impl Depot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the dispatch cooldown; true when a dispatch attempt is due
    pub fn tick_dispatch(&mut self, dt: f32, interval: f32) -> bool {
        self.dispatch_timer -= dt;
        if self.dispatch_timer > 0.0 {
            return false;
        }
        self.dispatch_timer = interval;
        true
    }

    pub fn has_heavy_pour(&self) -> bool {
        self.prioritizations
            .iter()
            .any(|p| p.mode == PrioritizationMode::HeavyPour)
    }

    pub fn add_prioritization(&mut self, prioritization: Prioritization) {
        self.prioritizations.push(prioritization);
    }

    pub fn remove_last_prioritization(&mut self) -> Option<Prioritization> {
        self.prioritizations.pop()
    }

    pub fn clear_prioritizations(&mut self) {
        self.prioritizations.clear();
    }

    /// Count down timed overrides and drop the expired ones
    pub fn update_prioritizations(&mut self, dt: f32) {
        self.prioritizations
            .retain(|p| p.time_remaining.map(|t| t > 0.0).unwrap_or(true));
        for p in &mut self.prioritizations {
            if let Some(t) = p.time_remaining.as_mut() {
                *t -= dt;
            }
        }
    }
}

/// One dispatch decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrder {
    /// A lone survivor walks to the target
    Walker,
    /// A courier carries goods; one held survivor drives
    Courier {
        kind: ResourceKind,
        amount: u32,
        /// Depot held more survivors than its quota when the driver left
        was_surplus: bool,
    },
}

/// Decide what `depot` sends to `target`
///
/// With `can_drain` the depot may go below its own quota; otherwise only
/// strict surplus is available.
pub fn plan_dispatch(depot: &Structure, target: &Structure, can_drain: bool, capacity: u32) -> Option<DispatchOrder> {
    let held = depot.present.survivors;
    if held == 0 {
        return None;
    }
    let available = |kind: ResourceKind| {
        if can_drain {
            depot.present.get(kind)
        } else {
            depot.surplus(kind)
        }
    };

    if target.needs(ResourceKind::Survivors) && available(ResourceKind::Survivors) > 0 {
        return Some(DispatchOrder::Walker);
    }

    for kind in [ResourceKind::Wood, ResourceKind::Bullets] {
        let avail = available(kind);
        if target.needs(kind) && avail >= capacity {
            let amount = capacity.min(target.deficit(kind)).min(avail);
            return Some(DispatchOrder::Courier {
                kind,
                amount,
                was_surplus: held > depot.quotas.survivors,
            });
        }
    }
    None
}

/// Sibling depot that `depot` could help from surplus
pub fn can_supply_sibling(depot: &Structure, sibling: &Structure) -> bool {
    ResourceKind::ALL
        .iter()
        .any(|k| sibling.needs(*k) && depot.surplus(*k) > 0)
}
