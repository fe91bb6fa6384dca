//! Census Model
//!
//! Value types shared by every part of the membership consensus core.
//!
//! # Pulses
//!
//! The protocol advances in discrete rounds called pulses. A [`PulseNumber`] is
//! strictly increasing and never repeats; [`PulseData`] carries the number, the
//! deltas to its neighbours and the round entropy.
//!
//! # Profiles
//!
//! ```text
//! StaticProfile   short id, public key, address, role   (fixed while a member)
//! NodeProfile     StaticProfile + mode + power           (announced each pulse)
//! CandidateProfile StaticProfile + requested power       (not yet admitted)
//! HostProfile     Member(NodeProfile) | Intro(...)       (resolved host)
//! ```
//!
//! # Cloud State
//!
//! A [`CloudStateHash`] chains each census version to its predecessor:
//! `H(prev ‖ pulse ‖ population_digest)`.

mod hash;
mod member;
mod profile;
mod pulse;

pub use hash::CloudStateHash;
pub use member::{
    CapacityLevel, LeaveReason, MemberPower, OpMode, PowerRequest, PublicKey, ShortNodeId,
    StaticRole,
};
pub use profile::{
    CandidateProfile, HostAddress, HostIdentity, HostProfile, NodeIntroProfile, NodeProfile,
    StaticProfile,
};
pub use pulse::{Entropy, PulseData, PulseNumber};
