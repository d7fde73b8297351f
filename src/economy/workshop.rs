//! Workshop: a harvesting rig bound to exactly one target

use serde::{Deserialize, Serialize};

use crate::core::types::{BridgeId, DebrisId, GridPosition, RuinId};
use crate::economy::resources::Resources;

/// What a workshop works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkshopTarget {
    /// Loot a ruin through its door
    Ruin(RuinId),
    /// Scavenge a debris pile
    Debris(DebrisId),
    /// Strip a camp of survivors and goods
    Camp(GridPosition),
    /// Gather dropped cargo
    Cargo(GridPosition),
    /// Set charges under a bridge
    Demolition { bridge: Option<BridgeId> },
    /// Clear blocking rubble back to ground
    Rubble,
}

/// Goods leaving the workshop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shipment {
    Courier { wood: u32, bullets: u32 },
    /// The lone worker drives a load out and walks back to keep harvesting
    Shuttle { wood: u32, bullets: u32 },
    /// A collected survivor walks back on foot
    Walker,
}

/// Workshop payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workshop {
    pub target: WorkshopTarget,
    /// Harvested goods waiting to be shipped
    pub collected: Resources,
    /// Demolition or rubble ticks completed
    pub progress: u32,
    pub collection_timer: f32,
    pub noise_counter: u32,
    pub truck_timer: f32,
    /// Target exhausted; waiting out the close-out delay
    pub closing: bool,
    pub finished: bool,
}

/// `base × growth^(survivors − 1)` collections per second
pub fn collection_rate(survivors: u32, base: f32, growth: f32) -> f32 {
    if survivors == 0 {
        return 0.0;
    }
    base * growth.powi(survivors as i32 - 1)
}

impl Workshop {
    pub fn new(target: WorkshopTarget) -> Self {
        Self {
            target,
            collected: Resources::default(),
            progress: 0,
            collection_timer: 0.0,
            noise_counter: 0,
            truck_timer: 0.0,
            closing: false,
            finished: false,
        }
    }

    /// Accumulate work; returns the number of completed collection ticks
    pub fn accumulate(&mut self, dt: f32, rate: f32) -> u32 {
        self.collection_timer += dt * rate;
        let mut completed = 0;
        while self.collection_timer >= 1.0 {
            self.collection_timer -= 1.0;
            completed += 1;
        }
        completed
    }

    /// Count one completed unit; true when a medium noise is due
    pub fn register_unit(&mut self, threshold: u32) -> bool {
        self.noise_counter += 1;
        if self.noise_counter >= threshold {
            self.noise_counter = 0;
            return true;
        }
        false
    }

    /// Target exhausted: start the close-out countdown
    pub fn request_close(&mut self) {
        if !self.closing {
            self.closing = true;
            self.collection_timer = 0.0;
        }
    }

    /// Advance the close-out countdown; true once it has elapsed
    pub fn tick_closeout(&mut self, dt: f32, delay: f32) -> bool {
        self.collection_timer += dt;
        self.collection_timer >= delay
    }

    /// Periodic shipping, at most one departure per interval
    ///
    /// Couriers leave only while at least one worker would stay behind,
    /// except that a lone worker shuttles full loads and returns.
    pub fn next_shipment(&mut self, dt: f32, interval: f32, workers: u32, capacity: u32) -> Vec<Shipment> {
        self.truck_timer += dt;
        let mut out = Vec::new();
        while self.truck_timer >= interval {
            self.truck_timer -= interval;
            let drivers = out.iter().filter(|s| !matches!(s, Shipment::Walker)).count() as u32;
            if workers > drivers + 1 {
                if let Some((wood, bullets)) = self.full_load(capacity) {
                    out.push(Shipment::Courier { wood, bullets });
                    continue;
                }
            } else if workers == 1 && drivers == 0 {
                if let Some((wood, bullets)) = self.full_load(capacity) {
                    out.push(Shipment::Shuttle { wood, bullets });
                    continue;
                }
            }
            if self.collected.survivors > 0 {
                self.collected.survivors -= 1;
                out.push(Shipment::Walker);
                continue;
            }
            // Nothing to send: don't bank departures
            self.truck_timer = self.truck_timer.min(interval);
            break;
        }
        out
    }

    /// Take a full truckload of wood, else of bullets
    fn full_load(&mut self, capacity: u32) -> Option<(u32, u32)> {
        if self.collected.wood >= capacity {
            self.collected.wood -= capacity;
            return Some((capacity, 0));
        }
        if self.collected.bullets >= capacity {
            self.collected.bullets -= capacity;
            return Some((0, capacity));
        }
        None
    }

    /// Final couriers at close-out, one driver each while workers remain
    pub fn final_shipments(&mut self, mut workers: u32, capacity: u32) -> Vec<Shipment> {
        let mut out = Vec::new();
        while workers > 0 && self.collected.has_goods() {
            let shipment = if self.collected.wood > 0 {
                let wood = self.collected.wood.min(capacity);
                self.collected.wood -= wood;
                Shipment::Courier { wood, bullets: 0 }
            } else {
                let bullets = self.collected.bullets.min(capacity);
                self.collected.bullets -= bullets;
                Shipment::Courier { wood: 0, bullets }
            };
            workers -= 1;
            out.push(shipment);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_rate_grows_per_worker() {
        assert_eq!(collection_rate(0, 1.0, 1.35), 0.0);
        assert!((collection_rate(1, 1.0, 1.35) - 1.0).abs() < 1e-6);
        assert!((collection_rate(3, 1.0, 1.35) - 1.8225).abs() < 1e-4);
    }

    #[test]
    fn test_accumulate_counts_whole_ticks() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        assert_eq!(w.accumulate(0.6, 1.0), 0);
        assert_eq!(w.accumulate(0.6, 1.0), 1);
        assert_eq!(w.accumulate(1.0, 2.0), 2);
    }

    #[test]
    fn test_noise_every_threshold_units() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        let noises = (0..45).filter(|_| w.register_unit(20)).count();
        assert_eq!(noises, 2);
        assert_eq!(w.noise_counter, 5);
    }

    #[test]
    fn test_single_worker_shuttles_full_loads() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        w.collected = Resources::new(0, 25, 0);
        let shipped = w.next_shipment(1.0, 0.2, 1, 10);
        assert_eq!(shipped, vec![Shipment::Shuttle { wood: 10, bullets: 0 }]);
        assert_eq!(w.collected.wood, 15);
    }

    #[test]
    fn test_single_worker_waits_for_full_load() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        w.collected = Resources::new(0, 9, 9);
        assert!(w.next_shipment(1.0, 0.2, 1, 10).is_empty());
        assert_eq!(w.collected, Resources::new(0, 9, 9));
    }

    #[test]
    fn test_shipping_keeps_one_worker() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        w.collected = Resources::new(1, 30, 10);
        let shipped = w.next_shipment(1.0, 0.2, 3, 10);
        assert_eq!(
            shipped,
            vec![
                Shipment::Courier { wood: 10, bullets: 0 },
                Shipment::Courier { wood: 10, bullets: 0 },
                Shipment::Walker,
            ]
        );
        assert_eq!(w.collected, Resources::new(0, 10, 10));
        assert!(w.truck_timer <= 0.2);
    }

    #[test]
    fn test_final_shipments_limited_by_drivers() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        w.collected = Resources::new(0, 20, 5);
        let shipped = w.final_shipments(1, 10);
        assert_eq!(shipped, vec![Shipment::Courier { wood: 10, bullets: 0 }]);
        assert_eq!(w.collected, Resources::new(0, 10, 5));
    }

    #[test]
    fn test_closeout_delay() {
        let mut w = Workshop::new(WorkshopTarget::Rubble);
        w.collection_timer = 0.7;
        w.request_close();
        assert!(!w.tick_closeout(0.5, 1.0));
        assert!(w.tick_closeout(0.5, 1.0));
    }
}
