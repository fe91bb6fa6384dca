//! Cloud state hash: the digest that chains census versions together.

use std::fmt;

use crate::pulse::PulseNumber;

/// Domain separator for cloud state chaining.
const CLOUD_STATE_CONTEXT: &[u8] = b"census:cloud-state";

/// A 32-byte digest binding a census version to its predecessor and to the
/// population it agreed on. Immutable value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CloudStateHash(pub [u8; 32]);

impl CloudStateHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The root of a chain, derived from a network-wide seed.
    pub fn genesis(seed: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(CLOUD_STATE_CONTEXT);
        hasher.update(b":genesis:");
        hasher.update(seed);
        Self(*hasher.finalize().as_bytes())
    }

    /// The successor of `prev` for `pulse`, binding a population digest.
    ///
    /// H(context ‖ prev ‖ pulse ‖ population_digest)
    pub fn chain(prev: &CloudStateHash, pulse: PulseNumber, population_digest: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(CLOUD_STATE_CONTEXT);
        hasher.update(&prev.0);
        hasher.update(&pulse.get().to_le_bytes());
        hasher.update(population_digest);
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Whether this is the all-zero placeholder.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for CloudStateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", &self.to_hex()[..8])
    }
}
