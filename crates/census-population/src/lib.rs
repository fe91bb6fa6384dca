//! Census Population
//!
//! The member set of one census version and its compact per-member encoding.
//!
//! ```text
//! Population (pulse N) ──evolve──► Population (pulse N+1)
//!      │
//!      └── BitsetMapper: ShortNodeId <-> [0, online_count)
//!                │
//!                └── VoteBitset: 2 bits per mapped member
//! ```
//!
//! A mapper and every bitset built through it carry the population's
//! [`MapperVersion`], so votes can never be read against the wrong snapshot.

mod bitset;
mod error;
mod mapper;
mod population;

pub use bitset::{MemberVote, VoteBitset};
pub use error::{Error, Result};
pub use mapper::{BitsetMapper, MapperVersion};
pub use population::{MembershipChange, Population};
