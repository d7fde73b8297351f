//! The tile grid world: terrain, terrain-fixed objects, pathfinding and placement

pub mod grid;
pub mod level;
pub mod objects;
pub mod pathfinding;
pub mod placement;

pub use grid::{GameMap, GridTile, TileKind};
pub use level::{Level, LevelKind};
pub use objects::{Bridge, Camp, DebrisKind, DebrisPile, DoorSide, DroppedCargo, RuinBuilding};
pub use pathfinding::{find_path, find_route};
pub use placement::PlacementOutcome;
