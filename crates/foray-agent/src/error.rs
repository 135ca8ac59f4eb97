//! Error types for the foray-agent crate.
//!
//! Everything here is a contract violation: an item table that does not
//! cover a name, a label that does not come from the action-space
//! enumeration, or an id that the current observation does not carry.
//! Recoverable conditions (unreachable targets, vanished chase targets) are
//! handled in place and never surface as errors.

use foray_types::EntityId;
use foray_world::WorldError;

/// Errors that can occur while extracting state or translating actions.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An item name with no eligibility rule.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// An action label the parser does not recognise.
    #[error("unparseable {category} action: {label}")]
    UnparseableLabel {
        /// Category key (`ml_action`, `use`, `destroy`, `give`).
        category: &'static str,
        /// The offending label.
        label: String,
    },

    /// A label that is not in the action space it was chosen from.
    #[error("{label} is not in the {category} action space")]
    NotInSpace {
        /// Category key.
        category: &'static str,
        /// The offending label.
        label: String,
    },

    /// An entity id the current observation does not contain.
    #[error("entity {0} is not in the current observation")]
    MissingEntity(EntityId),

    /// An item id the current inventory does not contain.
    #[error("item {0} is not in the current inventory")]
    MissingItem(u32),

    /// A label pattern failed to compile.
    #[error("invalid label pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A geometry or partition failure from the world crate.
    #[error(transparent)]
    World(#[from] WorldError),
}
