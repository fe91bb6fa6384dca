//! Error types for census-population.

use census_model::ShortNodeId;
use thiserror::Error;

use crate::mapper::MapperVersion;

/// Result type for population operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or reading populations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A profile without a resolvable identity.
    #[error("node profile carries the absent short id")]
    AbsentNodeId,

    /// The same short id appears twice.
    #[error("duplicate node {0}")]
    DuplicateNode(ShortNodeId),

    /// A change refers to a node that is not a member.
    #[error("unknown node {0}")]
    UnknownNode(ShortNodeId),

    /// An evicted profile was offered as a member.
    #[error("evicted node {0} cannot be a member")]
    EvictedMember(ShortNodeId),

    /// A bitset was read through a mapper of a different population version.
    #[error("bitset of population {found} read through mapper of population {expected}")]
    VersionMismatch {
        expected: MapperVersion,
        found: MapperVersion,
    },

    /// Encoded bitset bytes are malformed.
    #[error("invalid bitset encoding: {0}")]
    Decode(String),
}
