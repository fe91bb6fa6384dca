//! Node, candidate and host profiles.

use std::net::SocketAddr;

use crate::member::{MemberPower, OpMode, PowerRequest, PublicKey, ShortNodeId, StaticRole};
use crate::pulse::PulseNumber;

/// A host's network address.
pub type HostAddress = SocketAddr;

/// What identifies a host before its profile is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostIdentity {
    /// Where the host can be reached.
    pub address: HostAddress,
    /// The short id, when the host has already announced one.
    pub short_id: Option<ShortNodeId>,
}

impl HostIdentity {
    /// Identity known only by address.
    pub const fn by_address(address: HostAddress) -> Self {
        Self {
            address,
            short_id: None,
        }
    }
}

/// The part of a profile that never changes while a node is a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticProfile {
    pub short_id: ShortNodeId,
    pub public_key: PublicKey,
    pub address: HostAddress,
    pub role: StaticRole,
}

impl StaticProfile {
    /// Bytes a node signs when introducing itself.
    pub fn intro_bytes(&self) -> Vec<u8> {
        let address = self.address.to_string();
        let mut bytes = Vec::with_capacity(4 + 32 + 1 + address.len());
        bytes.extend_from_slice(&self.short_id.to_le_bytes());
        bytes.extend_from_slice(self.public_key.as_bytes());
        bytes.push(self.role as u8);
        bytes.extend_from_slice(address.as_bytes());
        bytes
    }
}

/// A member of the population: static identity plus announced attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeProfile {
    pub static_profile: StaticProfile,
    pub mode: OpMode,
    pub power: MemberPower,
}

impl NodeProfile {
    /// A normally operating member.
    pub fn new(static_profile: StaticProfile, power: MemberPower) -> Self {
        Self {
            static_profile,
            mode: OpMode::Normal,
            power,
        }
    }

    pub fn short_id(&self) -> ShortNodeId {
        self.static_profile.short_id
    }

    pub fn address(&self) -> HostAddress {
        self.static_profile.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.static_profile.public_key
    }

    /// Whether the member currently contributes capacity.
    pub fn is_powered(&self) -> bool {
        !self.power.is_zero() && !self.mode.is_restricted()
    }
}

/// A node asking to be admitted to the population.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateProfile {
    pub static_profile: StaticProfile,
    pub requested_power: PowerRequest,
    /// Pulse in which the join request was received.
    pub announced_at: PulseNumber,
}

impl CandidateProfile {
    pub fn new(static_profile: StaticProfile, requested_power: PowerRequest) -> Self {
        Self {
            static_profile,
            requested_power,
            announced_at: PulseNumber::UNKNOWN,
        }
    }

    pub fn short_id(&self) -> ShortNodeId {
        self.static_profile.short_id
    }

    /// Whether the candidate carries a resolvable identity.
    pub fn has_identity(&self) -> bool {
        !self.static_profile.short_id.is_absent()
    }

    /// The member profile this candidate becomes once admitted.
    pub fn into_member(self) -> NodeProfile {
        NodeProfile::new(self.static_profile, self.requested_power.power())
    }
}

/// A member profile bound to the local certificate's key material, so
/// announcements from the host can be checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeIntroProfile {
    pub member: NodeProfile,
    /// Public key of the certificate that vouches for this profile.
    pub certificate_key: PublicKey,
    /// Whether the certificate lists the host as a discovery node.
    pub is_discovery: bool,
}

/// A resolved host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostProfile {
    /// An active member known to the current population.
    Member(NodeProfile),
    /// A member profile resolved through the certificate.
    Intro(NodeIntroProfile),
}

impl HostProfile {
    pub fn node(&self) -> &NodeProfile {
        match self {
            Self::Member(node) => node,
            Self::Intro(intro) => &intro.member,
        }
    }

    pub fn static_profile(&self) -> &StaticProfile {
        &self.node().static_profile
    }

    pub fn short_id(&self) -> ShortNodeId {
        self.node().short_id()
    }

    pub fn address(&self) -> HostAddress {
        self.node().address()
    }

    /// The key announcements from this host must verify against.
    pub fn verifying_key(&self) -> &PublicKey {
        self.node().public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::CapacityLevel;

    fn static_profile(id: u32) -> StaticProfile {
        StaticProfile {
            short_id: ShortNodeId(id),
            public_key: PublicKey([id as u8; 32]),
            address: format!("127.0.0.1:{}", 9000 + id).parse().unwrap(),
            role: StaticRole::Virtual,
        }
    }

    #[test]
    fn candidate_becomes_member_with_requested_power() {
        let candidate = CandidateProfile::new(
            static_profile(3),
            PowerRequest::ByLevel(CapacityLevel::Reduced),
        );
        assert!(candidate.has_identity());

        let member = candidate.into_member();
        assert_eq!(member.short_id(), ShortNodeId(3));
        assert_eq!(member.mode, OpMode::Normal);
        assert_eq!(member.power, CapacityLevel::Reduced.default_power());
    }

    #[test]
    fn candidate_without_identity() {
        let candidate = CandidateProfile::new(static_profile(0), PowerRequest::default());
        assert!(!candidate.has_identity());
    }

    #[test]
    fn intro_bytes_differ_per_node() {
        assert_ne!(static_profile(1).intro_bytes(), static_profile(2).intro_bytes());
        assert_eq!(static_profile(1).intro_bytes(), static_profile(1).intro_bytes());
    }

    #[test]
    fn host_profile_exposes_member() {
        let node = NodeProfile::new(static_profile(5), MemberPower(10));
        let intro = HostProfile::Intro(NodeIntroProfile {
            member: node.clone(),
            certificate_key: PublicKey([9; 32]),
            is_discovery: false,
        });
        assert_eq!(intro.short_id(), ShortNodeId(5));
        assert_eq!(intro.node(), HostProfile::Member(node).node());
    }

    #[test]
    fn zero_power_member_is_unpowered() {
        let mut node = NodeProfile::new(static_profile(1), MemberPower(10));
        assert!(node.is_powered());
        node.power = MemberPower::ZERO;
        assert!(!node.is_powered());
    }
}
