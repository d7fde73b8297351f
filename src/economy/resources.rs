//! Resource kinds and clamped resource bundles

use serde::{Deserialize, Serialize};

/// The three goods that flow through the colony
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Survivors,
    Wood,
    Bullets,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Survivors, ResourceKind::Wood, ResourceKind::Bullets];

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "survivors" | "survivor" | "s" => Some(ResourceKind::Survivors),
            "wood" | "w" => Some(ResourceKind::Wood),
            "bullets" | "bullet" | "b" => Some(ResourceKind::Bullets),
            _ => None,
        }
    }
}

/// A bundle of survivors, wood and bullets
///
/// Used both for amounts on hand and for desired quotas. All subtraction
/// saturates at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub survivors: u32,
    pub wood: u32,
    pub bullets: u32,
}

/// Desired standing amounts, same shape as goods on hand
pub type Quotas = Resources;

impl Resources {
    pub const fn new(survivors: u32, wood: u32, bullets: u32) -> Self {
        Self { survivors, wood, bullets }
    }

    pub fn cargo(wood: u32, bullets: u32) -> Self {
        Self::new(0, wood, bullets)
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Survivors => self.survivors,
            ResourceKind::Wood => self.wood,
            ResourceKind::Bullets => self.bullets,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Survivors => &mut self.survivors,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Bullets => &mut self.bullets,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, amount: u32) {
        *self.get_mut(kind) = amount;
    }

    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.get_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Remove up to `amount`, returns amount actually removed
    pub fn take(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let slot = self.get_mut(kind);
        let removed = amount.min(*slot);
        *slot -= removed;
        removed
    }

    /// Apply a signed adjustment, clamping at zero
    pub fn adjust(&mut self, kind: ResourceKind, delta: i64) {
        let current = self.get(kind) as i64;
        let next = (current + delta).clamp(0, u32::MAX as i64);
        self.set(kind, next as u32);
    }

    pub fn merge(&mut self, other: Resources) {
        for kind in ResourceKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    /// Take everything, leaving this bundle empty
    pub fn drain(&mut self) -> Resources {
        std::mem::take(self)
    }

    pub fn total(&self) -> u64 {
        self.survivors as u64 + self.wood as u64 + self.bullets as u64
    }

    pub fn is_empty(&self) -> bool {
        self.survivors == 0 && self.wood == 0 && self.bullets == 0
    }

    pub fn has_goods(&self) -> bool {
        self.wood > 0 || self.bullets > 0
    }

    /// Remove one unit in priority order survivors > wood > bullets
    pub fn take_one_by_priority(&mut self) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| self.take(*kind, 1) == 1)
    }

    /// `max(0, quota - present)` for one kind
    pub fn deficit(quotas: &Quotas, present: &Resources, kind: ResourceKind) -> u32 {
        quotas.get(kind).saturating_sub(present.get(kind))
    }

    /// Amount above quota for one kind
    pub fn surplus(quotas: &Quotas, present: &Resources, kind: ResourceKind) -> u32 {
        present.get(kind).saturating_sub(quotas.get(kind))
    }
}

impl std::ops::Add for Resources {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self.merge(rhs);
        self
    }
}

impl std::fmt::Display for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s/{}w/{}b", self.survivors, self.wood, self.bullets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clamps_at_zero() {
        let mut r = Resources::new(1, 5, 0);
        assert_eq!(r.take(ResourceKind::Wood, 8), 5);
        assert_eq!(r.wood, 0);
        assert_eq!(r.take(ResourceKind::Bullets, 1), 0);
        assert_eq!(r.bullets, 0);
    }

    #[test]
    fn test_adjust_clamps_negative() {
        let mut q = Quotas::new(2, 10, 0);
        q.adjust(ResourceKind::Survivors, -5);
        q.adjust(ResourceKind::Wood, 10);
        assert_eq!(q.survivors, 0);
        assert_eq!(q.wood, 20);
    }

    #[test]
    fn test_priority_order() {
        let mut r = Resources::new(1, 1, 1);
        assert_eq!(r.take_one_by_priority(), Some(ResourceKind::Survivors));
        assert_eq!(r.take_one_by_priority(), Some(ResourceKind::Wood));
        assert_eq!(r.take_one_by_priority(), Some(ResourceKind::Bullets));
        assert_eq!(r.take_one_by_priority(), None);
    }

    #[test]
    fn test_deficit_and_surplus() {
        let quotas = Quotas::new(3, 10, 0);
        let present = Resources::new(5, 4, 2);
        assert_eq!(Resources::deficit(&quotas, &present, ResourceKind::Survivors), 0);
        assert_eq!(Resources::deficit(&quotas, &present, ResourceKind::Wood), 6);
        assert_eq!(Resources::surplus(&quotas, &present, ResourceKind::Survivors), 2);
        assert_eq!(Resources::surplus(&quotas, &present, ResourceKind::Bullets), 2);
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!(ResourceKind::parse("Wood"), Some(ResourceKind::Wood));
        assert_eq!(ResourceKind::parse("b"), Some(ResourceKind::Bullets));
        assert_eq!(ResourceKind::parse("gold"), None);
    }
}
