//! Join-candidate feeders.
//!
//! The round driver asks a feeder for the next candidate to admit and removes
//! it once the round decided. Candidates are matched by short id only, so a
//! re-announcement from the same node replaces its earlier request.

use std::cmp::Ordering;

use census_model::{CandidateProfile, Entropy, PulseData, PulseNumber, ShortNodeId};
use tracing::{debug, info};

use crate::lazyhead::LazyHeadList;

/// Domain separator for candidate priority keys.
const PRIORITY_CONTEXT: &[u8] = b"census:candidate-priority";

/// Source of join candidates for a consensus round.
pub trait CandidateFeeder {
    /// The candidate to consider next, without removing it.
    fn pick_next_join_candidate(&self) -> Option<&CandidateProfile>;

    /// Drop the first queued candidate with `id`. `candidate_added` tells
    /// whether the round admitted it. Returns whether anything was removed.
    fn remove_join_candidate(&mut self, candidate_added: bool, id: ShortNodeId) -> bool;

    /// Queue a candidate.
    ///
    /// # Panics
    ///
    /// If the candidate carries the absent short id.
    fn add_join_candidate(&mut self, candidate: CandidateProfile);
}

fn ensure_identity(candidate: &CandidateProfile) {
    if !candidate.has_identity() {
        panic!("illegal state: join candidate without identity");
    }
}

/// First come, first served.
#[derive(Debug, Clone, Default)]
pub struct SequentialCandidateFeeder {
    buf: Vec<CandidateProfile>,
}

impl SequentialCandidateFeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl CandidateFeeder for SequentialCandidateFeeder {
    fn pick_next_join_candidate(&self) -> Option<&CandidateProfile> {
        self.buf.first()
    }

    fn remove_join_candidate(&mut self, candidate_added: bool, id: ShortNodeId) -> bool {
        let Some(index) = self.buf.iter().position(|c| c.short_id() == id) else {
            return false;
        };
        self.buf.remove(index);
        debug!(candidate = %id, added = candidate_added, "join candidate removed");
        true
    }

    fn add_join_candidate(&mut self, candidate: CandidateProfile) {
        ensure_identity(&candidate);
        debug!(candidate = %candidate.short_id(), "join candidate queued");
        self.buf.push(candidate);
    }
}

/// Admission order key: `blake3(context ‖ entropy ‖ short_id)`.
///
/// Every honest member derives the same order from the same pulse entropy,
/// and no node can choose an id that wins every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePriority(pub [u8; 32]);

impl CandidatePriority {
    pub fn derive(entropy: &Entropy, id: ShortNodeId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(PRIORITY_CONTEXT);
        hasher.update(entropy.as_bytes());
        hasher.update(&id.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

/// A candidate with its priority for the current round.
#[derive(Debug, Clone)]
pub struct QueuedCandidate {
    pub priority: CandidatePriority,
    pub profile: CandidateProfile,
}

impl QueuedCandidate {
    pub fn new(entropy: &Entropy, profile: CandidateProfile) -> Self {
        Self {
            priority: CandidatePriority::derive(entropy, profile.short_id()),
            profile,
        }
    }
}

// Ordered by priority, then id. Profiles with equal keys are the same queue slot.
impl Ord for QueuedCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.profile.short_id().cmp(&other.profile.short_id()))
    }
}

impl PartialOrd for QueuedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedCandidate {}

/// Candidates ordered by per-round priority.
///
/// Only the `max_joiners` best candidates of a round are kept sorted; the rest
/// of the queue is ordered lazily when a round actually reaches it.
#[derive(Debug, Clone)]
pub struct PrioritizedCandidateFeeder {
    queue: LazyHeadList<QueuedCandidate>,
    entropy: Entropy,
    round: PulseNumber,
}

impl PrioritizedCandidateFeeder {
    /// # Panics
    ///
    /// If `max_joiners` is zero.
    pub fn new(max_joiners: usize) -> Self {
        Self {
            queue: LazyHeadList::new(max_joiners),
            entropy: Entropy::default(),
            round: PulseNumber::UNKNOWN,
        }
    }

    /// Re-key every queued candidate with the entropy of `pulse`.
    ///
    /// The queue is left unordered; the round's head cut selects its joiners.
    pub fn begin_round(&mut self, pulse: &PulseData) {
        let entropy = pulse.entropy;
        self.entropy = entropy;
        self.round = pulse.pulse_number;

        let queued = self.queue.drain_unsorted();
        let count = queued.len();
        self.queue.extend_unsorted(
            queued
                .into_iter()
                .map(|entry| QueuedCandidate::new(&entropy, entry.profile)),
        );
        debug!(pulse = %self.round, queued = count, "candidate queue re-keyed");
    }

    /// Remove this round's best candidates, at most `max_joiners()` of them.
    pub fn take_round_batch(&mut self) -> Vec<CandidateProfile> {
        let batch: Vec<_> = self
            .queue
            .cut_off_head(self.queue.head_len())
            .into_iter()
            .map(|q| q.profile)
            .collect();
        if !batch.is_empty() {
            info!(
                pulse = %self.round,
                admitted = batch.len(),
                waiting = self.queue.len(),
                "join candidates selected"
            );
        }
        batch
    }

    pub fn max_joiners(&self) -> usize {
        self.queue.head_len()
    }

    /// Pulse of the current round.
    pub fn round(&self) -> PulseNumber {
        self.round
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a candidate with `id` is queued.
    pub fn contains(&self, id: ShortNodeId) -> bool {
        self.queue.iter().any(|q| q.profile.short_id() == id)
    }
}

impl CandidateFeeder for PrioritizedCandidateFeeder {
    fn pick_next_join_candidate(&self) -> Option<&CandidateProfile> {
        self.queue.peek_min().map(|q| &q.profile)
    }

    fn remove_join_candidate(&mut self, candidate_added: bool, id: ShortNodeId) -> bool {
        let removed = self
            .queue
            .remove_first(|q| q.profile.short_id() == id)
            .is_some();
        if removed {
            debug!(candidate = %id, added = candidate_added, "join candidate removed");
        }
        removed
    }

    fn add_join_candidate(&mut self, mut candidate: CandidateProfile) {
        ensure_identity(&candidate);
        let id = candidate.short_id();
        if candidate.announced_at.is_unknown() {
            candidate.announced_at = self.round;
        }

        if self.queue.remove_first(|q| q.profile.short_id() == id).is_some() {
            debug!(candidate = %id, "join candidate re-announced");
        } else {
            debug!(candidate = %id, "join candidate queued");
        }
        self.queue.add(QueuedCandidate::new(&self.entropy, candidate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazyhead::SortState;
    use census_model::{CapacityLevel, PowerRequest, PublicKey, StaticProfile, StaticRole};

    fn candidate(id: u32) -> CandidateProfile {
        CandidateProfile::new(
            StaticProfile {
                short_id: ShortNodeId(id),
                public_key: PublicKey([id as u8; 32]),
                address: format!("10.2.0.{}:7900", id).parse().unwrap(),
                role: StaticRole::LightMaterial,
            },
            PowerRequest::default(),
        )
    }

    fn pulse(n: u32, seed: &[u8]) -> PulseData {
        PulseData::genesis(PulseNumber(n), 10, Entropy::from_seed(seed))
    }

    #[test]
    fn sequential_pick_on_empty() {
        let feeder = SequentialCandidateFeeder::new();
        assert!(feeder.pick_next_join_candidate().is_none());
    }

    #[test]
    fn sequential_remove_on_empty() {
        let mut feeder = SequentialCandidateFeeder::new();
        assert!(!feeder.remove_join_candidate(false, ShortNodeId(0)));
    }

    #[test]
    fn sequential_add_then_remove() {
        let mut feeder = SequentialCandidateFeeder::new();
        feeder.add_join_candidate(candidate(1));
        assert_eq!(
            feeder.pick_next_join_candidate().map(|c| c.short_id()),
            Some(ShortNodeId(1))
        );

        assert!(!feeder.remove_join_candidate(false, ShortNodeId(2)));
        assert!(feeder.remove_join_candidate(true, ShortNodeId(1)));
        assert!(feeder.is_empty());
        assert!(!feeder.remove_join_candidate(true, ShortNodeId(1)));
    }

    #[test]
    fn sequential_keeps_arrival_order() {
        let mut feeder = SequentialCandidateFeeder::new();
        feeder.add_join_candidate(candidate(7));
        feeder.add_join_candidate(candidate(3));
        assert!(feeder.remove_join_candidate(false, ShortNodeId(7)));
        assert_eq!(feeder.len(), 1);
        assert_eq!(
            feeder.pick_next_join_candidate().map(|c| c.short_id()),
            Some(ShortNodeId(3))
        );
    }

    #[test]
    #[should_panic(expected = "join candidate without identity")]
    fn sequential_rejects_absent_identity() {
        SequentialCandidateFeeder::new().add_join_candidate(candidate(0));
    }

    #[test]
    fn priority_depends_on_entropy() {
        let a = Entropy::from_seed(b"a");
        let b = Entropy::from_seed(b"b");
        assert_eq!(
            CandidatePriority::derive(&a, ShortNodeId(1)),
            CandidatePriority::derive(&a, ShortNodeId(1))
        );
        assert_ne!(
            CandidatePriority::derive(&a, ShortNodeId(1)),
            CandidatePriority::derive(&b, ShortNodeId(1))
        );
    }

    #[test]
    fn prioritized_pick_is_lowest_priority_key() {
        let mut feeder = PrioritizedCandidateFeeder::new(3);
        let pd = pulse(65537, b"round");
        feeder.begin_round(&pd);
        for id in 1..=10 {
            feeder.add_join_candidate(candidate(id));
        }

        let best = (1..=10)
            .min_by_key(|&id| CandidatePriority::derive(&pd.entropy, ShortNodeId(id)))
            .unwrap();
        assert_eq!(
            feeder.pick_next_join_candidate().map(|c| c.short_id()),
            Some(ShortNodeId(best))
        );
    }

    #[test]
    fn prioritized_batch_is_deterministic_across_insert_order() {
        let pd = pulse(65537, b"shared");
        let mut forward = PrioritizedCandidateFeeder::new(4);
        let mut backward = PrioritizedCandidateFeeder::new(4);
        forward.begin_round(&pd);
        backward.begin_round(&pd);
        for id in 1..=12 {
            forward.add_join_candidate(candidate(id));
            backward.add_join_candidate(candidate(13 - id));
        }

        let a: Vec<_> = forward.take_round_batch().iter().map(|c| c.short_id()).collect();
        let b: Vec<_> = backward.take_round_batch().iter().map(|c| c.short_id()).collect();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
        assert_eq!(forward.len(), 8);
    }

    #[test]
    fn re_announcement_replaces_request() {
        let mut feeder = PrioritizedCandidateFeeder::new(2);
        feeder.begin_round(&pulse(65537, b"x"));
        feeder.add_join_candidate(candidate(5));

        let mut again = candidate(5);
        again.requested_power = PowerRequest::ByLevel(CapacityLevel::Minimal);
        feeder.add_join_candidate(again);

        assert_eq!(feeder.len(), 1);
        let picked = feeder.pick_next_join_candidate().unwrap();
        assert_eq!(picked.requested_power, PowerRequest::ByLevel(CapacityLevel::Minimal));
        assert_eq!(picked.announced_at, PulseNumber(65537));
    }

    #[test]
    fn prioritized_remove_and_contains() {
        let mut feeder = PrioritizedCandidateFeeder::new(2);
        assert!(!feeder.remove_join_candidate(false, ShortNodeId(1)));
        feeder.add_join_candidate(candidate(1));
        feeder.add_join_candidate(candidate(2));
        feeder.add_join_candidate(candidate(3));
        assert!(feeder.contains(ShortNodeId(2)));
        assert!(feeder.remove_join_candidate(false, ShortNodeId(2)));
        assert!(!feeder.contains(ShortNodeId(2)));
        assert!(!feeder.remove_join_candidate(false, ShortNodeId(2)));
        assert_eq!(feeder.len(), 2);
    }

    #[test]
    fn new_round_reorders_queue() {
        let mut feeder = PrioritizedCandidateFeeder::new(16);
        for id in 1..=16 {
            feeder.add_join_candidate(candidate(id));
        }
        let pd = pulse(65547, b"next");
        feeder.begin_round(&pd);

        let mut expected: Vec<u32> = (1..=16).collect();
        expected.sort_by_key(|&id| CandidatePriority::derive(&pd.entropy, ShortNodeId(id)));
        let batch: Vec<u32> = feeder.take_round_batch().iter().map(|c| c.short_id().0).collect();
        assert_eq!(batch, expected);
        assert!(feeder.is_empty());
    }

    #[test]
    fn new_round_leaves_tail_unsorted() {
        let mut feeder = PrioritizedCandidateFeeder::new(4);
        for id in 1..=16 {
            feeder.add_join_candidate(candidate(id));
        }
        let pd = pulse(65547, b"rekey");
        feeder.begin_round(&pd);
        assert_eq!(feeder.queue.state(), SortState::UnsortedAll);
        assert_eq!(feeder.len(), 16);

        let mut expected: Vec<u32> = (1..=16).collect();
        expected.sort_by_key(|&id| CandidatePriority::derive(&pd.entropy, ShortNodeId(id)));
        let batch: Vec<u32> = feeder.take_round_batch().iter().map(|c| c.short_id().0).collect();
        assert_eq!(batch, expected[..4].to_vec());
        assert_eq!(feeder.len(), 12);
    }
}
