//! Resource economy: quotas, storage and the player structure variants

pub mod depot;
pub mod outpost;
pub mod resources;
pub mod structure;
pub mod wall;
pub mod workshop;

pub use depot::{Depot, DispatchOrder, Prioritization, PrioritizationMode};
pub use outpost::Outpost;
pub use resources::{Quotas, ResourceKind, Resources};
pub use structure::{Structure, StructureKind, StructureType};
pub use wall::Wall;
pub use workshop::{Workshop, WorkshopTarget};
