//! The member set of one census version.
//!
//! A population is immutable. The population of pulse N+1 is derived from the
//! one of pulse N with [`Population::evolve`], leaving N untouched for anyone
//! still holding it.

use std::collections::{BTreeMap, HashMap};

use census_model::{
    CandidateProfile, HostAddress, MemberPower, NodeProfile, OpMode, PulseNumber, ShortNodeId,
};

use crate::error::{Error, Result};

/// Where a member sits within the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Online(usize),
    Offline(usize),
}

/// A change applied when moving a population to the next pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    /// An admitted candidate joins as an online member.
    Join(CandidateProfile),
    /// A member announced a new mode and power. Evicted modes remove it.
    Update {
        id: ShortNodeId,
        mode: OpMode,
        power: MemberPower,
    },
    /// A member stopped responding but stays known.
    GoOffline(ShortNodeId),
    /// An offline member is reachable again.
    GoOnline(ShortNodeId),
    /// A member completed a graceful leave.
    Leave(ShortNodeId),
}

/// Online and offline members for a single pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    pulse: PulseNumber,
    /// Ascending by short id.
    online: Vec<NodeProfile>,
    /// Ascending by short id.
    offline: Vec<NodeProfile>,
    index: HashMap<ShortNodeId, Placement>,
    digest: [u8; 32],
}

impl Population {
    /// Build a population, validating that every member has a unique identity.
    pub fn new(
        pulse: PulseNumber,
        mut online: Vec<NodeProfile>,
        mut offline: Vec<NodeProfile>,
    ) -> Result<Self> {
        online.sort_by_key(NodeProfile::short_id);
        offline.sort_by_key(NodeProfile::short_id);

        let mut index = HashMap::with_capacity(online.len() + offline.len());
        let placed = online
            .iter()
            .enumerate()
            .map(|(i, n)| (n, Placement::Online(i)))
            .chain(
                offline
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n, Placement::Offline(i))),
            );
        for (node, placement) in placed {
            let id = node.short_id();
            if id.is_absent() {
                return Err(Error::AbsentNodeId);
            }
            if node.mode.is_evicted() {
                return Err(Error::EvictedMember(id));
            }
            if index.insert(id, placement).is_some() {
                return Err(Error::DuplicateNode(id));
            }
        }

        let digest = Self::compute_digest(&online, &offline);
        Ok(Self {
            pulse,
            online,
            offline,
            index,
            digest,
        })
    }

    /// A population with no members.
    pub fn empty(pulse: PulseNumber) -> Self {
        Self {
            pulse,
            online: Vec::new(),
            offline: Vec::new(),
            index: HashMap::new(),
            digest: Self::compute_digest(&[], &[]),
        }
    }

    fn compute_digest(online: &[NodeProfile], offline: &[NodeProfile]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(online.len() as u32).to_le_bytes());
        for node in online {
            hasher.update(&node.static_profile.intro_bytes());
            hasher.update(&[node.mode as u8, node.power.0]);
        }
        hasher.update(&(offline.len() as u32).to_le_bytes());
        for node in offline {
            hasher.update(&node.short_id().to_le_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    /// The pulse this population belongs to.
    pub fn pulse(&self) -> PulseNumber {
        self.pulse
    }

    /// Live members driving consensus this round, ascending by short id.
    pub fn online(&self) -> &[NodeProfile] {
        &self.online
    }

    /// Known but unreachable members, ascending by short id.
    pub fn offline(&self) -> &[NodeProfile] {
        &self.offline
    }

    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Online plus offline.
    pub fn len(&self) -> usize {
        self.online.len() + self.offline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Online members with non-zero power.
    pub fn powered_count(&self) -> usize {
        self.online.iter().filter(|n| n.is_powered()).count()
    }

    /// Find a member, online or offline.
    pub fn find(&self, id: ShortNodeId) -> Option<&NodeProfile> {
        match self.index.get(&id)? {
            Placement::Online(i) => self.online.get(*i),
            Placement::Offline(i) => self.offline.get(*i),
        }
    }

    /// Whether `id` is an online member.
    pub fn is_online(&self, id: ShortNodeId) -> bool {
        matches!(self.index.get(&id), Some(Placement::Online(_)))
    }

    /// Find a member by its network address.
    pub fn find_by_address(&self, address: &HostAddress) -> Option<&NodeProfile> {
        self.online
            .iter()
            .chain(self.offline.iter())
            .find(|n| n.address() == *address)
    }

    /// Digest over the ordered member identities and attributes.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Derive the population of `next_pulse` by applying `changes` in order.
    ///
    /// # Panics
    ///
    /// If `next_pulse` is not later than this population's pulse; a finalized
    /// population can only be followed, never rewritten.
    pub fn evolve(&self, next_pulse: PulseNumber, changes: &[MembershipChange]) -> Result<Self> {
        assert!(
            next_pulse > self.pulse,
            "illegal state: population of pulse {} cannot follow pulse {}",
            next_pulse,
            self.pulse
        );

        // (profile, online)
        let mut members: BTreeMap<ShortNodeId, (NodeProfile, bool)> = self
            .online
            .iter()
            .map(|n| (n.short_id(), (n.clone(), true)))
            .chain(self.offline.iter().map(|n| (n.short_id(), (n.clone(), false))))
            .collect();

        for change in changes {
            match change {
                MembershipChange::Join(candidate) => {
                    let id = candidate.short_id();
                    if id.is_absent() {
                        return Err(Error::AbsentNodeId);
                    }
                    if members.contains_key(&id) {
                        return Err(Error::DuplicateNode(id));
                    }
                    members.insert(id, (candidate.clone().into_member(), true));
                }
                MembershipChange::Update { id, mode, power } => {
                    if mode.is_evicted() {
                        members.remove(id).ok_or(Error::UnknownNode(*id))?;
                        continue;
                    }
                    let (node, _) = members.get_mut(id).ok_or(Error::UnknownNode(*id))?;
                    node.mode = *mode;
                    node.power = *power;
                }
                MembershipChange::GoOffline(id) => {
                    members.get_mut(id).ok_or(Error::UnknownNode(*id))?.1 = false;
                }
                MembershipChange::GoOnline(id) => {
                    members.get_mut(id).ok_or(Error::UnknownNode(*id))?.1 = true;
                }
                MembershipChange::Leave(id) => {
                    members.remove(id).ok_or(Error::UnknownNode(*id))?;
                }
            }
        }

        let (online, offline): (Vec<_>, Vec<_>) =
            members.into_values().partition(|(_, online)| *online);
        Self::new(
            next_pulse,
            online.into_iter().map(|(n, _)| n).collect(),
            offline.into_iter().map(|(n, _)| n).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_model::{PowerRequest, PublicKey, StaticProfile, StaticRole};

    fn profile(id: u32) -> NodeProfile {
        NodeProfile::new(static_profile(id), MemberPower(10))
    }

    fn static_profile(id: u32) -> StaticProfile {
        StaticProfile {
            short_id: ShortNodeId(id),
            public_key: PublicKey([id as u8; 32]),
            address: format!("10.0.0.{}:7900", id).parse().unwrap(),
            role: StaticRole::Virtual,
        }
    }

    fn population(ids: &[u32]) -> Population {
        Population::new(
            PulseNumber(65537),
            ids.iter().map(|&i| profile(i)).collect(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn members_are_ordered_by_id() {
        let pop = population(&[5, 1, 3]);
        let ids: Vec<_> = pop.online().iter().map(|n| n.short_id().0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(pop.online_count(), 3);
        assert!(pop.is_online(ShortNodeId(3)));
    }

    #[test]
    fn rejects_duplicates_across_partitions() {
        let err = Population::new(PulseNumber(65537), vec![profile(1)], vec![profile(1)]);
        assert_eq!(err, Err(Error::DuplicateNode(ShortNodeId(1))));
    }

    #[test]
    fn rejects_absent_id() {
        let err = Population::new(PulseNumber(65537), vec![profile(0)], vec![]);
        assert_eq!(err, Err(Error::AbsentNodeId));
    }

    #[test]
    fn digest_is_order_independent() {
        let a = population(&[1, 2, 3]);
        let b = population(&[3, 1, 2]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), population(&[1, 2]).digest());
    }

    #[test]
    fn find_by_address() {
        let pop = population(&[1, 2]);
        let addr: HostAddress = "10.0.0.2:7900".parse().unwrap();
        assert_eq!(pop.find_by_address(&addr).unwrap().short_id(), ShortNodeId(2));
        let unknown: HostAddress = "10.0.0.9:7900".parse().unwrap();
        assert!(pop.find_by_address(&unknown).is_none());
    }

    #[test]
    fn evolve_leaves_previous_version_untouched() {
        let pop = population(&[1, 2, 3]);
        let before = pop.clone();

        let next = pop
            .evolve(
                PulseNumber(65547),
                &[
                    MembershipChange::Join(CandidateProfile::new(
                        static_profile(4),
                        PowerRequest::default(),
                    )),
                    MembershipChange::GoOffline(ShortNodeId(2)),
                    MembershipChange::Update {
                        id: ShortNodeId(3),
                        mode: OpMode::EvictedAsFraud,
                        power: MemberPower::ZERO,
                    },
                ],
            )
            .unwrap();

        assert_eq!(pop, before);
        assert_eq!(next.pulse(), PulseNumber(65547));
        let online: Vec<_> = next.online().iter().map(|n| n.short_id().0).collect();
        assert_eq!(online, vec![1, 4]);
        assert_eq!(next.offline().len(), 1);
        assert!(next.find(ShortNodeId(3)).is_none());
    }

    #[test]
    fn evolve_rejects_unknown_member() {
        let pop = population(&[1]);
        let err = pop.evolve(PulseNumber(65547), &[MembershipChange::Leave(ShortNodeId(9))]);
        assert_eq!(err, Err(Error::UnknownNode(ShortNodeId(9))));
    }

    #[test]
    fn zero_power_update_keeps_member() {
        let pop = population(&[1, 2]);
        let next = pop
            .evolve(
                PulseNumber(65547),
                &[MembershipChange::Update {
                    id: ShortNodeId(2),
                    mode: OpMode::Normal,
                    power: MemberPower::ZERO,
                }],
            )
            .unwrap();
        assert_eq!(next.online_count(), 2);
        assert_eq!(next.powered_count(), 1);
    }

    #[test]
    #[should_panic(expected = "illegal state")]
    fn evolve_cannot_rewrite_same_pulse() {
        let pop = population(&[1]);
        let _ = pop.evolve(PulseNumber(65537), &[]);
    }
}
