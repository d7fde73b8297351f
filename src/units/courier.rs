//! Courier: a vehicle with one rider and up to a truckload of goods

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPosition, StructureId, UnitId};
use crate::economy::resources::Resources;
use crate::units::movement::{PathFollower, UnitState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: UnitId,
    pub mover: PathFollower,
    /// Wood and bullets on board; the rider is implicit
    pub cargo: Resources,
    /// Depot the rider belongs to
    pub source: Option<StructureId>,
    pub destination: StructureId,
    /// Last known cell of the destination, kept for wandering once lost
    pub destination_cell: GridPosition,
    /// Destination was a depot when assigned
    pub to_depot: bool,
    /// Workshop shipments leave their driver at the receiving depot
    pub from_workshop: bool,
    /// Source depot held more survivors than its quota at departure
    pub was_surplus: bool,
    /// Workshop the rider walks back to after unloading
    pub return_to: Option<StructureId>,
    pub lost: bool,
}

impl Courier {
    pub fn new(id: UnitId, cell: GridPosition, destination: StructureId, destination_cell: GridPosition) -> Self {
        Self {
            id,
            mover: PathFollower::at(cell),
            cargo: Resources::default(),
            source: None,
            destination,
            destination_cell,
            to_depot: false,
            from_workshop: false,
            was_surplus: false,
            return_to: None,
            lost: false,
        }
    }

    pub fn with_cargo(mut self, wood: u32, bullets: u32) -> Self {
        self.cargo = Resources::cargo(wood, bullets);
        self
    }

    pub fn with_source(mut self, source: Option<StructureId>) -> Self {
        self.source = source;
        self
    }

    pub fn cell(&self) -> GridPosition {
        self.mover.cell()
    }

    /// Rider plus cargo
    pub fn holdings(&self) -> Resources {
        Resources::new(1, self.cargo.wood, self.cargo.bullets)
    }

    pub fn state(&self) -> UnitState {
        if self.mover.has_path() {
            UnitState::Moving
        } else {
            UnitState::Idle
        }
    }

    /// Point the courier at a new depot
    pub fn retarget(&mut self, destination: StructureId, cell: GridPosition) {
        self.destination = destination;
        self.destination_cell = cell;
        self.to_depot = true;
        self.mover.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdings_include_rider() {
        let c = Courier::new(UnitId(1), GridPosition::new(0, 0), StructureId(2), GridPosition::new(5, 5))
            .with_cargo(10, 0);
        assert_eq!(c.holdings(), Resources::new(1, 10, 0));
        assert_eq!(c.state(), UnitState::Idle);
    }
}
