pub mod config;
pub mod error;
pub mod types;

pub use config::BalanceConfig;
pub use error::{ColonyError, Result};
pub use types::{BridgeId, DebrisId, GridPosition, RuinId, StructureId, Tick, UnitId, Vec2};
