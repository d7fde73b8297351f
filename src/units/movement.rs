//! Path following shared by every mobile unit

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPosition, Vec2};
use crate::world::grid::GameMap;
use crate::world::pathfinding::find_route;

/// Coarse unit state, as reported to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    Idle,
    Moving,
    Working,
    Attacking,
    Returning,
    Dead,
}

/// Outcome of one movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// No path to follow
    Idle,
    Moving,
    /// Reached the final waypoint during this step
    Arrived,
}

/// Precomputed path plus continuous position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFollower {
    pub position: Vec2,
    pub path: Vec<GridPosition>,
    pub index: usize,
}

impl PathFollower {
    pub fn at(cell: GridPosition) -> Self {
        Self {
            position: cell.center(),
            path: Vec::new(),
            index: 0,
        }
    }

    pub fn cell(&self) -> GridPosition {
        self.position.to_grid()
    }

    pub fn set_path(&mut self, path: Vec<GridPosition>) {
        self.path = path;
        self.index = 0;
    }

    /// Path to `goal` from the current cell; false if unreachable
    pub fn route_to(&mut self, map: &GameMap, goal: GridPosition) -> bool {
        match find_route(map, self.cell(), goal) {
            Some(path) => {
                self.set_path(path);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.index = 0;
    }

    pub fn has_path(&self) -> bool {
        self.index < self.path.len()
    }

    pub fn next_waypoint(&self) -> Option<GridPosition> {
        self.path.get(self.index).copied()
    }

    pub fn destination(&self) -> Option<GridPosition> {
        self.path.last().copied()
    }

    /// Move along the path by `speed * dt` cells
    ///
    /// Leftover distance after reaching a waypoint carries on to the next
    /// one, and every waypoint is visited in order.
    pub fn advance(&mut self, dt: f32, speed: f32, tolerance: f32) -> MoveStatus {
        if !self.has_path() {
            return MoveStatus::Idle;
        }
        let mut budget = speed * dt;
        while let Some(waypoint) = self.next_waypoint() {
            let target = waypoint.center();
            let dist = self.position.distance(&target);
            if dist <= tolerance || budget >= dist {
                budget = (budget - dist).max(0.0);
                self.position = target;
                self.index += 1;
                continue;
            }
            let dir = (target - self.position).normalize();
            self.position = self.position + dir * budget;
            return MoveStatus::Moving;
        }
        self.clear();
        MoveStatus::Arrived
    }
}

/// Cell `distance` steps from `from` toward `toward`, as lost units wander
///
/// Uses the Chebyshev-normalised direction so diagonal targets stay on a
/// straight heading.
pub fn wander_cell(from: GridPosition, toward: GridPosition, distance: i32) -> GridPosition {
    let dx = toward.x - from.x;
    let dy = toward.y - from.y;
    let d = dx.abs().max(dy.abs()).max(1);
    GridPosition::new(from.x + dx * distance / d, from.y + dy * distance / d)
}

/// Path for a lost unit: the full wander distance if reachable, else as far as possible
pub fn wander_route(map: &GameMap, from: GridPosition, toward: GridPosition, distance: i32) -> Option<Vec<GridPosition>> {
    (1..=distance.max(1)).rev().find_map(|k| {
        let cell = wander_cell(from, toward, k);
        if cell == from || !map.is_passable(cell) {
            return None;
        }
        find_route(map, from, cell)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::TileKind;

    fn straight_path(n: i32) -> Vec<GridPosition> {
        (0..=n).map(|x| GridPosition::new(x, 0)).collect()
    }

    #[test]
    fn test_advance_partial_step() {
        let mut f = PathFollower::at(GridPosition::new(0, 0));
        f.set_path(straight_path(4));
        assert_eq!(f.advance(0.25, 2.0, 0.125), MoveStatus::Moving);
        assert!((f.position.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_advance_large_step_visits_every_waypoint() {
        let mut f = PathFollower::at(GridPosition::new(0, 0));
        f.set_path(straight_path(10));
        // 10 cells in one step must still end exactly on the last cell
        assert_eq!(f.advance(1.0, 10.0, 0.125), MoveStatus::Arrived);
        assert_eq!(f.cell(), GridPosition::new(10, 0));
        assert!(!f.has_path());
    }

    #[test]
    fn test_arrival_timing() {
        let mut f = PathFollower::at(GridPosition::new(0, 0));
        f.set_path(straight_path(4));
        let mut steps = 0;
        while f.advance(0.1, 2.0, 0.125) != MoveStatus::Arrived {
            steps += 1;
            assert!(steps < 100);
        }
        // 4 cells at 2 cells/s is 2 seconds
        assert!((19..=20).contains(&steps));
    }

    #[test]
    fn test_wander_cell() {
        let from = GridPosition::new(10, 10);
        assert_eq!(wander_cell(from, GridPosition::new(30, 10), 4), GridPosition::new(14, 10));
        assert_eq!(wander_cell(from, GridPosition::new(20, 15), 4), GridPosition::new(14, 12));
        assert_eq!(wander_cell(from, GridPosition::new(12, 10), 4), GridPosition::new(14, 10));
        assert_eq!(wander_cell(from, from, 4), from);
    }

    #[test]
    fn test_wander_route_falls_back_to_shorter() {
        let mut map = GameMap::new(20, 20);
        map.set_tile(GridPosition::new(14, 10), TileKind::Water);
        map.set_tile(GridPosition::new(13, 10), TileKind::Water);
        let path = wander_route(&map, GridPosition::new(10, 10), GridPosition::new(30, 10), 4).unwrap();
        assert_eq!(*path.last().unwrap(), GridPosition::new(12, 10));
    }
}
