//! The simulation aggregate: registries, tick scheduler, noise bus and commands

pub mod combat;
pub mod commands;
pub mod dispatch;
pub mod events;
pub mod noise;
pub mod state;
pub mod tick;
pub mod transit;

pub use commands::{Command, CommandOutcome, OverlayKind, PrioritizationChange, TimeSpeed};
pub use events::{EventLog, SimEvent, SimEventKind};
pub use noise::NoiseLevel;
pub use state::{Ledger, Simulation};
