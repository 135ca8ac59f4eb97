//! Bounded shortest-path search over the tile grid.
//!
//! Movement is 4-connected with unit cost, so A* with the Manhattan heuristic
//! is exact. The search is confined to habitable cells inside an optional
//! bounding rectangle (the observation window in practice) and always
//! terminates: a disconnected goal exhausts the frontier and reports no
//! length.

use std::collections::{BTreeMap, BTreeSet};

use foray_types::{Bounds, Direction, Position};

use crate::grid::TileGrid;

/// Outcome of a bounded search: the first step and the total path length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// First hop from the start along a shortest path; [`Direction::Stay`]
    /// when already at the goal or when there is no path.
    pub direction: Direction,
    /// Number of steps of the shortest path; `None` when unreachable.
    pub length: Option<u32>,
}

impl Route {
    /// The "no path" result.
    pub const UNREACHABLE: Self = Self {
        direction: Direction::Stay,
        length: None,
    };

    /// Whether a path exists.
    pub const fn is_reachable(&self) -> bool {
        self.length.is_some()
    }
}

fn in_search_area(grid: &TileGrid, bounds: Option<Bounds>, pos: Position) -> bool {
    bounds.is_none_or(|b| b.contains(pos)) && grid.is_habitable(pos)
}

/// Shortest route from `start` to `goal` over habitable cells, restricted to
/// `bounds` when given.
pub fn route(grid: &TileGrid, start: Position, goal: Position, bounds: Option<Bounds>) -> Route {
    if start == goal && in_search_area(grid, bounds, start) {
        return Route {
            direction: Direction::Stay,
            length: Some(0),
        };
    }
    if !in_search_area(grid, bounds, start) || !in_search_area(grid, bounds, goal) {
        return Route::UNREACHABLE;
    }

    // Frontier ordered by (g + h, g, position).
    let mut queue: BTreeSet<(u32, u32, Position)> = BTreeSet::new();
    let mut cost: BTreeMap<Position, u32> = BTreeMap::new();
    let mut backtrace: BTreeMap<Position, Position> = BTreeMap::new();

    cost.insert(start, 0);
    queue.insert((start.l1(goal), 0, start));
    let mut found = false;

    while let Some((_, current_cost, current)) = queue.pop_first() {
        if current == goal {
            found = true;
            break;
        }
        let Some(next_cost) = current_cost.checked_add(1) else {
            continue;
        };
        for next in current.search_neighbours() {
            if !in_search_area(grid, bounds, next) {
                continue;
            }
            let is_shorter = cost
                .get(&next)
                .is_none_or(|&existing| next_cost < existing);
            if is_shorter {
                if let Some(&old) = cost.get(&next) {
                    queue.remove(&(old.saturating_add(next.l1(goal)), old, next));
                }
                cost.insert(next, next_cost);
                backtrace.insert(next, current);
                queue.insert((next_cost.saturating_add(next.l1(goal)), next_cost, next));
            }
        }
    }

    if !found {
        return Route::UNREACHABLE;
    }

    let mut step = goal;
    while let Some(&parent) = backtrace.get(&step) {
        if parent == start {
            break;
        }
        step = parent;
    }
    let (d_row, d_col) = start.delta_to(step);
    Route {
        direction: Direction::from_delta(d_row, d_col),
        length: cost.get(&goal).copied(),
    }
}

/// Path length only; `None` when unreachable.
pub fn distance(
    grid: &TileGrid,
    start: Position,
    goal: Position,
    bounds: Option<Bounds>,
) -> Option<u32> {
    route(grid, start, goal, bounds).length
}
