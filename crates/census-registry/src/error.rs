//! Error types for census-registry.

use census_model::ShortNodeId;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the round driver when a host cannot be resolved or
/// verified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The operation is an extension point this registry does not provide.
    #[error("not supported: {0}")]
    Unsupported(&'static str),

    /// Key bytes are not a valid public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A signature did not verify.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The host announced a different short id than the directory knows.
    #[error("host announced {announced} but is registered as {registered}")]
    IdentityMismatch {
        announced: ShortNodeId,
        registered: ShortNodeId,
    },
}
