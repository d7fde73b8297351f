//! Mobile units: couriers, hostiles and civilians

pub mod civilian;
pub mod courier;
pub mod hostile;
pub mod movement;

use serde::{Deserialize, Serialize};

pub use civilian::Civilian;
pub use courier::Courier;
pub use hostile::{AttackTarget, Hostile, HostileState};
pub use movement::{MoveStatus, PathFollower, UnitState};

/// Unit variant tag carried by events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Courier,
    Hostile,
    Civilian,
}
