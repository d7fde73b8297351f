//! Events emitted by the simulation for the presentation layer
//!
//! Each event carries enough data to render or animate without querying
//! back into the simulation.

use serde::{Deserialize, Serialize};

use crate::core::types::{BridgeId, GridPosition, StructureId, Tick, UnitId};
use crate::economy::structure::StructureType;
use crate::units::UnitKind;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    StructureCreated {
        id: StructureId,
        structure: StructureType,
        cell: GridPosition,
    },
    StructureDestroyed {
        id: StructureId,
        structure: StructureType,
        cell: GridPosition,
    },
    UnitSpawned {
        id: UnitId,
        unit: UnitKind,
        cell: GridPosition,
    },
    UnitRemoved {
        id: UnitId,
        unit: UnitKind,
        cell: GridPosition,
    },
    BridgeDestroyed {
        id: BridgeId,
        cells: Vec<GridPosition>,
    },
    ShotFired {
        from: GridPosition,
        /// None for a warning shot into the air
        to: Option<GridPosition>,
        hit: bool,
    },
    /// A scripted wave arrived at a bridge
    WaveSpawned {
        bridge: BridgeId,
        count: u32,
    },
    GameOver {
        victory: bool,
    },
    /// Terrain or a terrain-fixed object on this cell changed
    TileChanged {
        cell: GridPosition,
    },
}

/// An event stamped with the tick it happened on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: Tick,
    pub kind: SimEventKind,
}

/// Buffered events, drained by the presentation layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<SimEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, kind: SimEventKind) {
        self.events.push(SimEvent { tick, kind });
    }

    /// Take every buffered event
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_log() {
        let mut log = EventLog::new();
        log.push(3, SimEventKind::GameOver { victory: true });
        log.push(4, SimEventKind::TileChanged { cell: GridPosition::new(1, 1) });
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].tick, 3);
        assert!(log.is_empty());
    }

    #[test]
    fn test_events_serialize_to_json() {
        let event = SimEvent {
            tick: 7,
            kind: SimEventKind::ShotFired {
                from: GridPosition::new(1, 2),
                to: Some(GridPosition::new(4, 2)),
                hit: true,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ShotFired"));
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
