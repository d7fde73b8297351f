//! Player structures: shared quota contract plus per-kind payload

use serde::{Deserialize, Serialize};

use crate::core::config::BalanceConfig;
use crate::core::types::{GridPosition, StructureId};
use crate::economy::depot::Depot;
use crate::economy::outpost::Outpost;
use crate::economy::resources::{Quotas, ResourceKind, Resources};
use crate::economy::wall::Wall;
use crate::economy::workshop::{Workshop, WorkshopTarget};

/// Buildable structure types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureType {
    Depot,
    Workshop,
    Outpost,
    Wall,
}

impl StructureType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "depot" => Some(StructureType::Depot),
            "workshop" => Some(StructureType::Workshop),
            "outpost" | "sniper" => Some(StructureType::Outpost),
            "wall" | "barricade" => Some(StructureType::Wall),
            _ => None,
        }
    }

    pub fn initial_quotas(self, config: &BalanceConfig) -> Quotas {
        match self {
            StructureType::Depot => config.depot_quotas,
            StructureType::Workshop => config.workshop_quotas,
            StructureType::Outpost => config.outpost_quotas,
            StructureType::Wall => config.wall_quotas,
        }
    }
}

/// Kind-specific state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructureKind {
    Depot(Depot),
    Workshop(Workshop),
    Outpost(Outpost),
    Wall(Wall),
}

/// A placed player structure
///
/// `present` is what the structure holds right now; for a depot that is
/// its held survivors and stored wood/bullets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub cell: GridPosition,
    pub quotas: Quotas,
    pub present: Resources,
    /// Depot that services this structure; revalidated before every use
    pub servicer: Option<StructureId>,
    pub kind: StructureKind,
}

impl Structure {
    pub fn new(id: StructureId, cell: GridPosition, kind: StructureKind, quotas: Quotas) -> Self {
        Self {
            id,
            cell,
            quotas,
            present: Resources::default(),
            servicer: None,
            kind,
        }
    }

    pub fn new_depot(id: StructureId, cell: GridPosition, config: &BalanceConfig) -> Self {
        Self::new(id, cell, StructureKind::Depot(Depot::new()), config.depot_quotas)
    }

    pub fn new_workshop(id: StructureId, cell: GridPosition, target: WorkshopTarget, config: &BalanceConfig) -> Self {
        Self::new(id, cell, StructureKind::Workshop(Workshop::new(target)), config.workshop_quotas)
    }

    pub fn new_outpost(id: StructureId, cell: GridPosition, config: &BalanceConfig) -> Self {
        Self::new(id, cell, StructureKind::Outpost(Outpost::new()), config.outpost_quotas)
    }

    pub fn new_wall(id: StructureId, cell: GridPosition, config: &BalanceConfig) -> Self {
        Self::new(id, cell, StructureKind::Wall(Wall::new()), config.wall_quotas)
    }

    pub fn structure_type(&self) -> StructureType {
        match self.kind {
            StructureKind::Depot(_) => StructureType::Depot,
            StructureKind::Workshop(_) => StructureType::Workshop,
            StructureKind::Outpost(_) => StructureType::Outpost,
            StructureKind::Wall(_) => StructureType::Wall,
        }
    }

    pub fn is_depot(&self) -> bool {
        matches!(self.kind, StructureKind::Depot(_))
    }

    pub fn as_depot(&self) -> Option<&Depot> {
        match &self.kind {
            StructureKind::Depot(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_depot_mut(&mut self) -> Option<&mut Depot> {
        match &mut self.kind {
            StructureKind::Depot(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_outpost(&self) -> Option<&Outpost> {
        match &self.kind {
            StructureKind::Outpost(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_outpost_mut(&mut self) -> Option<&mut Outpost> {
        match &mut self.kind {
            StructureKind::Outpost(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_workshop(&self) -> Option<&Workshop> {
        match &self.kind {
            StructureKind::Workshop(w) => Some(w),
            _ => None,
        }
    }

    pub fn blocks_movement(&self) -> bool {
        matches!(self.kind, StructureKind::Wall(_))
    }

    // ===== QUOTA CONTRACT =====

    pub fn needs(&self, kind: ResourceKind) -> bool {
        self.present.get(kind) < self.quotas.get(kind)
    }

    pub fn needs_any(&self) -> bool {
        ResourceKind::ALL.iter().any(|k| self.needs(*k))
    }

    pub fn deficit(&self, kind: ResourceKind) -> u32 {
        Resources::deficit(&self.quotas, &self.present, kind)
    }

    pub fn total_deficit(&self) -> u32 {
        ResourceKind::ALL.iter().map(|k| self.deficit(*k)).sum()
    }

    pub fn surplus(&self, kind: ResourceKind) -> u32 {
        Resources::surplus(&self.quotas, &self.present, kind)
    }

    pub fn adjust_quota(&mut self, kind: ResourceKind, delta: i64) {
        self.quotas.adjust(kind, delta);
    }

    /// Accept delivered goods
    pub fn receive(&mut self, kind: ResourceKind, amount: u32, config: &BalanceConfig) {
        if amount == 0 {
            return;
        }
        match &mut self.kind {
            StructureKind::Outpost(outpost) if kind == ResourceKind::Wood => {
                outpost.receive_wood(amount, &mut self.present, &mut self.quotas, config);
            }
            StructureKind::Depot(depot) => {
                depot.ever_stocked = true;
                self.present.add(kind, amount);
            }
            StructureKind::Wall(wall) => {
                if kind == ResourceKind::Wood {
                    wall.ever_stocked = true;
                }
                self.present.add(kind, amount);
            }
            _ => self.present.add(kind, amount),
        }
    }

    /// Whether the structure should be removed from the registry
    pub fn is_destroyed(&self) -> bool {
        match &self.kind {
            StructureKind::Depot(depot) => depot.abandoned || (depot.ever_stocked && self.present.is_empty()),
            StructureKind::Wall(wall) => wall.ever_stocked && self.present.wood == 0,
            StructureKind::Workshop(workshop) => workshop.finished,
            StructureKind::Outpost(_) => false,
        }
    }

    /// Everything the structure holds, counting goods locked in its payload
    pub fn holdings(&self) -> Resources {
        let mut total = self.present;
        match &self.kind {
            StructureKind::Workshop(w) => total.merge(w.collected),
            StructureKind::Outpost(o) => total.add(ResourceKind::Wood, o.construction_wood),
            _ => {}
        }
        total
    }
}
