//! Error types for the `foray-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use foray_types::{EntityId, Position};

/// Errors that can occur during grid and simulation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A partition query fell outside the axis range.
    #[error("{x} is not in the range [{start}, {end}]")]
    OutOfRange {
        /// The queried coordinate.
        x: i32,
        /// Range start (inclusive).
        start: i32,
        /// Range end (inclusive).
        end: i32,
    },

    /// An axis range with `end < start`.
    #[error("empty range [{start}, {end}]")]
    EmptyRange {
        /// Range start.
        start: i32,
        /// Range end.
        end: i32,
    },

    /// A position outside the tile grid.
    #[error("position {0} is off the map")]
    OffMap(Position),

    /// An observation had no tiles to bound.
    #[error("observation window is empty")]
    EmptyWindow,

    /// A player id that the simulation does not know.
    #[error("unknown player: {0}")]
    UnknownPlayer(EntityId),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,
}
