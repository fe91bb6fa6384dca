//! Member identity and the dynamic attributes a member announces each pulse.

use std::fmt;

/// Short numeric node identifier, unique within a network.
///
/// `0` is reserved as [`ShortNodeId::ABSENT`]; a profile carrying it has no
/// resolvable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortNodeId(pub u32);

impl ShortNodeId {
    /// The reserved "no identity" value.
    pub const ABSENT: Self = Self(0);

    /// Whether this id is the reserved absent value.
    pub const fn is_absent(self) -> bool {
        self.0 == 0
    }

    /// Little-endian bytes (for hashing).
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ShortNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ed25519 public key bytes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", &self.to_hex()[..8])
    }
}

/// The static role a node was certified for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StaticRole {
    /// No role assigned (discovery and bootstrap helpers).
    #[default]
    Neutral,
    /// Long-term storage.
    HeavyMaterial,
    /// Short-term storage and validation.
    LightMaterial,
    /// Contract execution.
    Virtual,
}

/// Operational mode a member is known to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpMode {
    /// Full participant.
    #[default]
    Normal,
    /// Member may only announce itself, it votes on nothing.
    RestrictedAnnouncement,
    /// Member is present but performs no work.
    SuspendedOps,
    /// Member left after a confirmed graceful leave.
    EvictedGracefully,
    /// Member was evicted for proven fraud.
    EvictedAsFraud,
    /// Member was evicted on suspicion.
    EvictedAsSuspected,
    /// Member was evicted because its keys are compromised.
    EvictedAsCompromised,
}

impl OpMode {
    /// Whether this mode removes the member from the population.
    pub const fn is_evicted(self) -> bool {
        matches!(
            self,
            Self::EvictedGracefully
                | Self::EvictedAsFraud
                | Self::EvictedAsSuspected
                | Self::EvictedAsCompromised
        )
    }

    /// Whether the member participates with reduced rights.
    pub const fn is_restricted(self) -> bool {
        matches!(self, Self::RestrictedAnnouncement | Self::SuspendedOps)
    }
}

/// Capacity a member contributes. Zero means "present but doing no work".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberPower(pub u8);

impl MemberPower {
    /// No capacity.
    pub const ZERO: Self = Self(0);

    /// Largest announceable power.
    pub const MAX: Self = Self(u8::MAX);

    /// Whether this is zero capacity.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Coarse capacity levels a node operator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapacityLevel {
    /// No capacity; used while leaving or shutting down.
    Zero,
    /// Bare minimum.
    Minimal,
    /// Below normal.
    Reduced,
    /// Regular operation.
    #[default]
    Normal,
    /// Everything the node has.
    Max,
}

impl CapacityLevel {
    /// The power a node announces for this level.
    pub const fn default_power(self) -> MemberPower {
        match self {
            Self::Zero => MemberPower(0),
            Self::Minimal => MemberPower(1),
            Self::Reduced => MemberPower(32),
            Self::Normal => MemberPower(128),
            Self::Max => MemberPower(255),
        }
    }
}

/// What a node asks the consensus to apply as its power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerRequest {
    /// Power chosen by the round from a capacity level.
    ByLevel(CapacityLevel),
    /// An explicit power value.
    ByPower(MemberPower),
}

impl PowerRequest {
    /// Request zero capacity.
    pub const ZERO: Self = Self::ByLevel(CapacityLevel::Zero);

    /// Whether this request resolves to zero power.
    pub const fn is_zero(self) -> bool {
        self.power().is_zero()
    }

    /// Resolve the request to a power value.
    pub const fn power(self) -> MemberPower {
        match self {
            Self::ByLevel(level) => level.default_power(),
            Self::ByPower(power) => power,
        }
    }
}

impl Default for PowerRequest {
    fn default() -> Self {
        Self::ByLevel(CapacityLevel::Normal)
    }
}

/// Reason code attached to a graceful leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaveReason(pub u32);

impl fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
