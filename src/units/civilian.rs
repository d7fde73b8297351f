//! Civilian: an unescorted survivor walking to a structure

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPosition, StructureId, UnitId};
use crate::units::movement::{PathFollower, UnitState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Civilian {
    pub id: UnitId,
    pub mover: PathFollower,
    pub destination: Option<StructureId>,
    pub destination_cell: Option<GridPosition>,
    /// Destination was a depot when assigned
    pub to_depot: bool,
    pub lost: bool,
}

impl Civilian {
    pub fn new(id: UnitId, cell: GridPosition) -> Self {
        Self {
            id,
            mover: PathFollower::at(cell),
            destination: None,
            destination_cell: None,
            to_depot: false,
            lost: false,
        }
    }

    pub fn cell(&self) -> GridPosition {
        self.mover.cell()
    }

    pub fn set_destination(&mut self, id: StructureId, cell: GridPosition, to_depot: bool) {
        self.destination = Some(id);
        self.destination_cell = Some(cell);
        self.to_depot = to_depot;
        self.mover.clear();
    }

    pub fn state(&self) -> UnitState {
        match (self.mover.has_path(), self.lost) {
            (true, false) => UnitState::Returning,
            (true, true) => UnitState::Moving,
            (false, _) => UnitState::Idle,
        }
    }
}
