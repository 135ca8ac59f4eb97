//! Grid positions and rectangular bounds.
//!
//! Coordinates follow the simulation's `(row, col)` convention: row grows
//! southward, column grows eastward.

use serde::{Deserialize, Serialize};

use crate::action::Direction;

/// A tile coordinate on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row index (north to south).
    pub row: i32,
    /// Column index (west to east).
    pub col: i32,
}

impl Position {
    /// Construct a position from row and column.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance.
    pub const fn l1(self, other: Self) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    /// Chebyshev distance, used for attack reach and displacement checks.
    pub const fn linf(self, other: Self) -> u32 {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        if dr > dc { dr } else { dc }
    }

    /// Shift by a row/column delta, saturating at the integer limits.
    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row.saturating_add(d_row),
            col: self.col.saturating_add(d_col),
        }
    }

    /// The position one step away in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (d_row, d_col) = direction.delta();
        self.offset(d_row, d_col)
    }

    /// Signed delta from `self` to `other`.
    pub const fn delta_to(self, other: Self) -> (i32, i32) {
        (
            other.row.saturating_sub(self.row),
            other.col.saturating_sub(self.col),
        )
    }

    /// The four orthogonal neighbours in pathfinder expansion order:
    /// north, west, south, east.
    pub const fn search_neighbours(self) -> [Self; 4] {
        [
            self.offset(-1, 0),
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
        ]
    }

    /// The four orthogonal neighbours in approach-cell order:
    /// east, west, south, north.
    pub const fn adjacent(self) -> [Self; 4] {
        [
            self.offset(0, 1),
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(-1, 0),
        ]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// An inclusive rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest row inside the rectangle.
    pub min_row: i32,
    /// Largest row inside the rectangle.
    pub max_row: i32,
    /// Smallest column inside the rectangle.
    pub min_col: i32,
    /// Largest column inside the rectangle.
    pub max_col: i32,
}

impl Bounds {
    /// Construct bounds from inclusive row and column ranges.
    pub const fn new(min_row: i32, max_row: i32, min_col: i32, max_col: i32) -> Self {
        Self {
            min_row,
            max_row,
            min_col,
            max_col,
        }
    }

    /// Whether `pos` lies inside the rectangle (edges included).
    pub const fn contains(self, pos: Position) -> bool {
        pos.row >= self.min_row
            && pos.row <= self.max_row
            && pos.col >= self.min_col
            && pos.col <= self.max_col
    }

    /// The smallest rectangle covering every position, or `None` when empty.
    pub fn covering<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        positions.into_iter().fold(None, |acc, pos| {
            Some(match acc {
                None => Self::new(pos.row, pos.row, pos.col, pos.col),
                Some(b) => Self::new(
                    b.min_row.min(pos.row),
                    b.max_row.max(pos.row),
                    b.min_col.min(pos.col),
                    b.max_col.max(pos.col),
                ),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let a = Position::new(3, 4);
        let b = Position::new(6, 2);
        assert_eq!(a.l1(b), 5);
        assert_eq!(a.linf(b), 3);
        assert_eq!(b.linf(a), 3);
    }

    #[test]
    fn neighbour_orders() {
        let p = Position::new(5, 5);
        assert_eq!(
            p.search_neighbours(),
            [
                Position::new(4, 5),
                Position::new(5, 4),
                Position::new(6, 5),
                Position::new(5, 6)
            ]
        );
        assert_eq!(p.adjacent().first().copied(), Some(Position::new(5, 6)));
    }

    #[test]
    fn covering_bounds() {
        let b = Bounds::covering([
            Position::new(2, 9),
            Position::new(7, 3),
            Position::new(4, 4),
        ]);
        assert_eq!(b, Some(Bounds::new(2, 7, 3, 9)));
        assert!(Bounds::covering(std::iter::empty()).is_none());
    }

    #[test]
    fn bounds_contains_edges() {
        let b = Bounds::new(0, 4, 0, 4);
        assert!(b.contains(Position::new(0, 4)));
        assert!(!b.contains(Position::new(5, 0)));
        assert!(!b.contains(Position::new(-1, 2)));
    }
}
