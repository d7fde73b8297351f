//! A* pathfinding on the tile grid
//!
//! 4-directional moves of unit cost with a Manhattan heuristic. Equal
//! f-scores are broken by the smaller heuristic, then by insertion order,
//! so identical maps always produce identical paths.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};

use crate::core::types::GridPosition;
use crate::world::grid::GameMap;

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct PathNode {
    cell: GridPosition,
    f_cost: u32,
    h_cost: u32,
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path using A*
///
/// The returned path includes both `start` and `goal`. Returns None if
/// either end is impassable or no connected route exists.
pub fn find_path(map: &GameMap, start: GridPosition, goal: GridPosition) -> Option<Vec<GridPosition>> {
    if !map.is_passable(start) || !map.is_passable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<GridPosition, GridPosition> = AHashMap::new();
    let mut g_scores: AHashMap<GridPosition, u32> = AHashMap::new();
    let mut closed: AHashSet<GridPosition> = AHashSet::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0);
    let h = start.manhattan(&goal);
    open_set.push(PathNode { cell: start, f_cost: h, h_cost: h, seq });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return Some(reconstruct_path(&came_from, current.cell));
        }
        if !closed.insert(current.cell) {
            continue;
        }

        let current_g = g_scores.get(&current.cell).copied().unwrap_or(u32::MAX);

        for neighbor in current.cell.neighbors() {
            if closed.contains(&neighbor) || !map.is_passable(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.cell);
                g_scores.insert(neighbor, tentative_g);

                seq += 1;
                let h_cost = neighbor.manhattan(&goal);
                open_set.push(PathNode {
                    cell: neighbor,
                    f_cost: tentative_g + h_cost,
                    h_cost,
                    seq,
                });
            }
        }
    }

    None // No path found
}

/// Path for a unit that may stand on, or head for, a blocked cell
///
/// A blocked start (a unit leaving a wall or a car wreck) steps out through
/// its first passable neighbour. A blocked goal is approached by ending on
/// its nearest passable neighbour.
pub fn find_route(map: &GameMap, start: GridPosition, goal: GridPosition) -> Option<Vec<GridPosition>> {
    if !map.in_bounds(start) || !map.in_bounds(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let exits: Vec<GridPosition> = if map.is_passable(start) {
        vec![start]
    } else {
        start.neighbors().into_iter().filter(|c| map.is_passable(*c)).collect()
    };
    let targets: Vec<GridPosition> = if map.is_passable(goal) {
        vec![goal]
    } else {
        goal.neighbors().into_iter().filter(|c| map.is_passable(*c)).collect()
    };

    let mut best: Option<Vec<GridPosition>> = None;
    for exit in &exits {
        for target in &targets {
            let Some(mut path) = find_path(map, *exit, *target) else {
                continue;
            };
            if *exit != start {
                path.insert(0, start);
            }
            if best.as_ref().map(|b| path.len() < b.len()).unwrap_or(true) {
                best = Some(path);
            }
        }
    }
    best
}

/// Number of steps along a path
pub fn path_cost(path: &[GridPosition]) -> u32 {
    path.len().saturating_sub(1) as u32
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<GridPosition, GridPosition>, mut current: GridPosition) -> Vec<GridPosition> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
