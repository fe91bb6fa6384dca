//! Census Admission
//!
//! Queues nodes asking to join and hands them to the round driver in an order
//! every honest member agrees on.
//!
//! - [`SequentialCandidateFeeder`]: arrival order.
//! - [`PrioritizedCandidateFeeder`]: order keyed by pulse entropy, backed by a
//!   [`LazyHeadList`] so a round only pays for sorting the candidates it can
//!   actually admit.

mod feeder;
mod lazyhead;

pub use feeder::{
    CandidateFeeder, CandidatePriority, PrioritizedCandidateFeeder, QueuedCandidate,
    SequentialCandidateFeeder,
};
pub use lazyhead::{LazyHeadList, SortState};
