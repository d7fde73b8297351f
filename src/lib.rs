//! Shattered Colony - deterministic colony-defense simulation core
//!
//! A tile-grid world with guarded ruins, bridges and scavengeable debris,
//! a quota-driven resource economy, noise-driven hostiles and a fixed-order
//! tick scheduler. Presentation layers talk to it through [`Command`]s and
//! drain [`SimEvent`]s.

pub mod core;
pub mod economy;
pub mod simulation;
pub mod units;
pub mod world;

pub use crate::core::{BalanceConfig, ColonyError, GridPosition, Result, StructureId, UnitId};
pub use crate::economy::{ResourceKind, Resources, StructureType};
pub use crate::simulation::{Command, CommandOutcome, SimEvent, SimEventKind, Simulation, TimeSpeed};
pub use crate::world::{GameMap, LevelKind, PlacementOutcome};
