//! The census node: wires the control feeder, the candidate queue and the
//! versioned census together and advances them one pulse at a time.

use std::sync::Arc;

use census_admission::{CandidateFeeder, PrioritizedCandidateFeeder};
use census_control::{
    ConsensusControlFeeder, ControlFeeder, ControlFeederInterceptor, ParticipationState,
};
use census_model::{
    CandidateProfile, CapacityLevel, HostIdentity, HostProfile, LeaveReason, MemberPower,
    OpMode, PowerRequest, PulseData, PulseNumber, ShortNodeId, StaticProfile,
};
use census_population::{MembershipChange, Population};
use census_registry::{
    CloudMandateRegistry, CryptographyService, DirectoryOfflinePopulation, FraudKind,
    MandateRegistry, Misbehavior, MisbehaviorRegistry, MisbehaviorReport, NodeDirectory,
    ReportingMisbehaviorRegistry, StaticCertificate, VersionedRegistries,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::round::{PulseRound, Verdict};

/// What the local node announces about itself for a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalAnnouncement {
    pub short_id: ShortNodeId,
    pub pulse: PulseNumber,
    pub power: PowerRequest,
    pub leave: Option<LeaveReason>,
}

/// Outcome of one finalized pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusSummary {
    pub pulse: PulseNumber,
    pub cloud_hash: String,
    pub online: usize,
    pub offline: usize,
    pub powered: usize,
    pub admitted: Vec<ShortNodeId>,
    pub evicted: Vec<ShortNodeId>,
    pub suspected: Vec<ShortNodeId>,
    pub waiting_candidates: usize,
    pub local_state: String,
}

struct CensusState {
    census: VersionedRegistries,
    mandate: CloudMandateRegistry,
    population: Population,
}

/// A member of the census.
///
/// All methods take `&self`; the node is shared between the pulse driver and
/// whoever requests a graceful leave.
pub struct CensusNode {
    config: NodeConfig,
    local: StaticProfile,
    crypto: Arc<dyn CryptographyService>,
    control: ControlFeederInterceptor<ConsensusControlFeeder>,
    candidates: Mutex<PrioritizedCandidateFeeder>,
    misbehavior: Arc<ReportingMisbehaviorRegistry>,
    directory: Arc<NodeDirectory>,
    state: RwLock<CensusState>,
}

impl CensusNode {
    /// Start a node on the census of `genesis`.
    ///
    /// `population` is the member set agreed for the genesis pulse; the local
    /// node may or may not be part of it.
    ///
    /// # Panics
    ///
    /// If `genesis` is not valid pulse data.
    pub fn start<C>(
        config: NodeConfig,
        local: StaticProfile,
        crypto: C,
        genesis: PulseData,
        population: Population,
    ) -> Self
    where
        C: CryptographyService + 'static,
    {
        let crypto: Arc<dyn CryptographyService> = Arc::new(crypto);
        let directory = Arc::new(NodeDirectory::from_population(&population));
        let certificate = StaticCertificate {
            public_key: crypto.public_key(),
            discovery_nodes: population.online().iter().map(|n| n.address()).collect(),
        };
        let misbehavior = Arc::new(ReportingMisbehaviorRegistry::new());
        let mandate = CloudMandateRegistry::genesis(config.network.as_bytes());

        let census = VersionedRegistries::new(
            Arc::new(mandate),
            misbehavior.clone(),
            Arc::new(DirectoryOfflinePopulation::new(
                directory.clone(),
                Arc::new(certificate),
                crypto.clone(),
            )),
        )
        .commit_next_pulse(genesis, &population);

        let mut candidates = PrioritizedCandidateFeeder::new(config.max_joiners);
        candidates.begin_round(&genesis);

        info!(
            local = %local.short_id,
            pulse = %genesis.pulse_number,
            members = population.online_count(),
            cloud_hash = %mandate.priming_cloud_hash(),
            "census node started"
        );

        Self {
            config,
            local,
            crypto,
            control: ControlFeederInterceptor::new(Arc::new(ConsensusControlFeeder::new())),
            candidates: Mutex::new(candidates),
            misbehavior,
            directory,
            state: RwLock::new(CensusState {
                census,
                mandate,
                population,
            }),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn local_id(&self) -> ShortNodeId {
        self.local.short_id
    }

    /// The current census version.
    pub fn census(&self) -> VersionedRegistries {
        self.state.read().census.clone()
    }

    pub fn population(&self) -> Population {
        self.state.read().population.clone()
    }

    pub fn pulse(&self) -> PulseNumber {
        self.state.read().census.pulse()
    }

    /// Directory the offline population resolves hosts through.
    pub fn directory(&self) -> &Arc<NodeDirectory> {
        &self.directory
    }

    pub fn misbehavior(&self) -> &ReportingMisbehaviorRegistry {
        &self.misbehavior
    }

    pub fn participation(&self) -> ParticipationState {
        self.control.state()
    }

    pub fn set_power_level(&self, level: CapacityLevel) {
        self.control.set_required_power_level(level);
    }

    /// Signature over the local node's intro bytes.
    pub fn sign_intro(&self) -> [u8; 64] {
        self.crypto.sign(&self.local.intro_bytes())
    }

    /// The local profile announcement for the next pulse.
    pub fn announce(&self) -> LocalAnnouncement {
        LocalAnnouncement {
            short_id: self.local.short_id,
            pulse: self.pulse(),
            power: self.control.required_power_level(),
            leave: self.control.required_graceful_leave(),
        }
    }

    /// Queue a join request after checking its intro signature.
    ///
    /// Returns `false` when the candidate is already a member. A signature
    /// that does not verify is reported as fraud and returned as an error.
    pub fn add_join_candidate(
        &self,
        candidate: CandidateProfile,
        signature: &[u8; 64],
    ) -> Result<bool> {
        let id = candidate.short_id();
        let profile = &candidate.static_profile;
        if let Err(err) =
            self.crypto
                .verify(&profile.public_key, &profile.intro_bytes(), signature)
        {
            self.report_misbehavior(
                MisbehaviorReport::new(
                    id,
                    Misbehavior::Fraud(FraudKind::InvalidSignature),
                    self.pulse(),
                )
                .with_host(profile.address)
                .with_details("join request"),
            );
            return Err(err.into());
        }

        if self.state.read().population.find(id).is_some() {
            debug!(candidate = %id, "join request from a member ignored");
            return Ok(false);
        }
        self.candidates.lock().add_join_candidate(candidate);
        Ok(true)
    }

    /// Forward a report to the current census's misbehavior registry.
    pub fn report_misbehavior(&self, report: MisbehaviorReport) {
        let registry = self.state.read().census.misbehavior_registry().clone();
        registry.add_report(report);
    }

    /// Resolve a host: online members first, then the offline population.
    pub fn resolve_host(&self, identity: &HostIdentity) -> Result<Option<HostProfile>> {
        let (member, census) = {
            let state = self.state.read();
            let member = state
                .population
                .online()
                .iter()
                .find(|n| n.address() == identity.address)
                .cloned();
            (member, state.census.clone())
        };
        if let Some(node) = member {
            return Ok(Some(HostProfile::Member(node)));
        }
        Ok(census.offline_population().find_registered_profile(identity)?)
    }

    /// Open the round for `pulse` over the current online population.
    ///
    /// # Panics
    ///
    /// If `pulse` does not follow the current census pulse.
    pub fn begin_round(&self, pulse: PulseData) -> PulseRound {
        let state = self.state.read();
        assert!(
            pulse.pulse_number > state.census.pulse(),
            "illegal state: round of pulse {} cannot follow pulse {}",
            pulse.pulse_number,
            state.census.pulse()
        );
        self.control.pulse_detected();
        PulseRound::new(pulse, &state.population)
    }

    /// Apply a finished round: verdicts, admitted candidates and the local
    /// announcement become the population and census of the round's pulse.
    pub fn finalize_round(&self, round: PulseRound) -> Result<CensusSummary> {
        let pulse_data = round.pulse_data();
        let pulse = pulse_data.pulse_number;
        let outcome = round.decide();
        debug!(pulse = %pulse, "{}", round.render());

        let mut state = self.state.write();
        let mut changes = outcome.changes();
        let evicted = outcome.with_verdict(Verdict::Fraud);
        let suspected = outcome.with_verdict(Verdict::Suspected);
        for &id in &evicted {
            let host = state.population.find(id).map(|n| n.address());
            let mut report =
                MisbehaviorReport::new(id, Misbehavior::Fraud(FraudKind::QuorumVerdict), pulse)
                    .with_details(format!("{} reporters", outcome.reporters));
            if let Some(host) = host {
                report = report.with_host(host);
            }
            state.census.misbehavior_registry().add_report(report);
        }

        let local_id = self.local.short_id;
        let local_member = state.population.find(local_id).cloned();
        let local_decided = evicted.contains(&local_id) || suspected.contains(&local_id);
        if let (Some(member), false) = (&local_member, local_decided) {
            // A leave is applied once zero power was confirmed in an earlier pulse.
            let change = match self.control.required_graceful_leave() {
                Some(_) if member.power.is_zero() => MembershipChange::Update {
                    id: local_id,
                    mode: OpMode::EvictedGracefully,
                    power: MemberPower::ZERO,
                },
                _ => MembershipChange::Update {
                    id: local_id,
                    mode: member.mode,
                    power: self.control.required_power_level().power(),
                },
            };
            changes.push(change);
        }

        let batch = {
            let mut candidates = self.candidates.lock();
            candidates.begin_round(&pulse_data);
            candidates.take_round_batch()
        };
        let mut admitted = Vec::with_capacity(batch.len());
        for candidate in batch {
            let id = candidate.short_id();
            if state.population.find(id).is_some() || admitted.contains(&id) {
                debug!(candidate = %id, "candidate already a member, skipped");
                continue;
            }
            admitted.push(id);
            changes.push(MembershipChange::Join(candidate));
        }

        let population = state.population.evolve(pulse, &changes)?;
        let mandate = state.mandate.chain_next(pulse, &population);
        let census = state
            .census
            .with_mandate_registry(Arc::new(mandate))
            .commit_next_pulse(pulse_data, &population);
        self.directory.sync_with(&population);

        state.census = census;
        state.mandate = mandate;
        state.population = population;
        let summary = CensusSummary {
            pulse,
            cloud_hash: mandate.priming_cloud_hash().to_hex(),
            online: state.population.online_count(),
            offline: state.population.offline().len(),
            powered: state.population.powered_count(),
            admitted,
            evicted,
            suspected,
            waiting_candidates: self.candidates.lock().len(),
            local_state: String::new(),
        };
        let applied = local_member.map(|_| state.population.find(local_id).cloned());
        drop(state);

        // Callbacks run without the census lock; they may call back into the node.
        if let Some(applied) = applied {
            let (mode, power) = match applied {
                Some(node) => (node.mode, node.power),
                None if summary.evicted.contains(&local_id) => {
                    (OpMode::EvictedAsFraud, MemberPower::ZERO)
                }
                None => (OpMode::EvictedGracefully, MemberPower::ZERO),
            };
            self.control.on_applied_membership_profile(mode, power, pulse);
            if mode == OpMode::EvictedGracefully {
                if let Some(reason) = self.control.required_graceful_leave() {
                    self.control.on_applied_graceful_leave(reason, pulse);
                }
            }
        }

        let summary = CensusSummary {
            local_state: format!("{:?}", self.control.state()),
            ..summary
        };
        info!(
            pulse = %summary.pulse,
            online = summary.online,
            admitted = summary.admitted.len(),
            evicted = summary.evicted.len(),
            local = %summary.local_state,
            "census finalized"
        );
        Ok(summary)
    }

    /// Announce a graceful leave and wait until the consensus evicts the node.
    ///
    /// Rounds must keep being finalized by another task while this waits.
    pub async fn leave_gracefully(&self, reason: LeaveReason) -> Result<()> {
        let signal = self.control.leave(reason);
        info!(%reason, timeout = ?self.config.leave_timeout, "graceful leave requested");
        match tokio::time::timeout(self.config.leave_timeout, signal.wait()).await {
            Ok(result) => {
                result?;
                info!(%reason, "left the census");
                Ok(())
            }
            Err(_) => {
                warn!(%reason, "graceful leave not confirmed");
                Err(Error::StuckLeave {
                    reason,
                    waited: self.config.leave_timeout,
                })
            }
        }
    }
}

impl std::fmt::Debug for CensusNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CensusNode")
            .field("local", &self.local.short_id)
            .field("pulse", &self.pulse())
            .field("participation", &self.participation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{LocalCluster, SimulatedPeer};
    use census_model::NodeProfile;
    use census_population::{MemberVote, VoteBitset};
    use std::time::Duration;

    fn node_with_cluster(config: NodeConfig) -> (CensusNode, LocalCluster) {
        let mut cluster = LocalCluster::new(&config);
        let population = cluster.genesis_population().unwrap();
        let local = cluster.local_peer();
        let node = CensusNode::start(
            config,
            local.profile,
            local.crypto,
            cluster.current_pulse(),
            population,
        );
        (node, cluster)
    }

    fn finalize_trusted(node: &CensusNode, cluster: &mut LocalCluster) -> CensusSummary {
        let pulse = cluster.next_pulse().unwrap();
        let mut round = node.begin_round(pulse);
        cluster.fill_round(&mut round).unwrap();
        node.finalize_round(round).unwrap()
    }

    #[test]
    fn step_advances_census() {
        let (node, mut cluster) = node_with_cluster(NodeConfig::default());
        let genesis_hash = node.census().mandate_registry().priming_cloud_hash();
        assert_eq!(node.pulse(), PulseNumber::MIN_TIME_PULSE);

        assert!(cluster.step(&node).unwrap());
        assert_eq!(node.pulse(), PulseNumber(65547));
        assert_eq!(node.population().online_count(), 4);
        assert_ne!(node.census().mandate_registry().priming_cloud_hash(), genesis_hash);
        assert_eq!(node.participation(), ParticipationState::Normal);
    }

    #[test]
    fn candidate_is_admitted_next_round() {
        let (node, mut cluster) = node_with_cluster(NodeConfig::default());
        let peer = SimulatedPeer::generate(ShortNodeId(9), "127.0.0.1:7999".parse().unwrap());
        let candidate = CandidateProfile::new(peer.profile.clone(), PowerRequest::default());
        assert!(node.add_join_candidate(candidate, &peer.sign_intro()).unwrap());

        let summary = finalize_trusted(&node, &mut cluster);
        assert_eq!(summary.admitted, vec![ShortNodeId(9)]);
        assert_eq!(summary.online, 5);
        assert_eq!(summary.waiting_candidates, 0);
        assert!(node.population().is_online(ShortNodeId(9)));
    }

    #[test]
    fn member_join_request_is_ignored() {
        let (node, _cluster) = node_with_cluster(NodeConfig::default());
        let peer = SimulatedPeer::generate(ShortNodeId(2), "127.0.0.1:7901".parse().unwrap());
        let candidate = CandidateProfile::new(peer.profile.clone(), PowerRequest::default());
        assert!(!node.add_join_candidate(candidate, &peer.sign_intro()).unwrap());
    }

    #[test]
    fn forged_join_request_is_reported() {
        let (node, _cluster) = node_with_cluster(NodeConfig::default());
        let peer = SimulatedPeer::generate(ShortNodeId(9), "127.0.0.1:7999".parse().unwrap());
        let forger = SimulatedPeer::generate(ShortNodeId(9), "127.0.0.1:7999".parse().unwrap());
        let candidate = CandidateProfile::new(peer.profile.clone(), PowerRequest::default());

        let err = node
            .add_join_candidate(candidate, &forger.sign_intro())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(census_registry::Error::InvalidSignature)
        ));
        assert_eq!(node.misbehavior().fraud_count(), 1);
    }

    #[test]
    fn quorum_fraud_evicts_member() {
        let (node, mut cluster) = node_with_cluster(NodeConfig::default());
        let pulse = cluster.next_pulse().unwrap();
        let mut round = node.begin_round(pulse);

        let mut votes = VoteBitset::new(round.mapper());
        for index in 0..votes.len() {
            votes.set(index, MemberVote::Trusted);
        }
        votes
            .set_by_id(round.mapper(), ShortNodeId(3), MemberVote::Fraud)
            .unwrap();
        for id in 1..=4 {
            round.add_report(ShortNodeId(id), &votes).unwrap();
        }

        let summary = node.finalize_round(round).unwrap();
        assert_eq!(summary.evicted, vec![ShortNodeId(3)]);
        assert_eq!(summary.online, 3);
        assert!(node.population().find(ShortNodeId(3)).is_none());
        assert_eq!(node.misbehavior().fraud_count(), 1);
    }

    #[test]
    fn resolves_members_and_directory_hosts() {
        let (node, _cluster) = node_with_cluster(NodeConfig::default());
        let member = node.population().online()[1].clone();
        let resolved = node
            .resolve_host(&HostIdentity::by_address(member.address()))
            .unwrap();
        assert_eq!(resolved, Some(HostProfile::Member(member)));

        let outsider = SimulatedPeer::generate(ShortNodeId(20), "10.9.0.20:7900".parse().unwrap());
        node.directory()
            .insert(NodeProfile::new(outsider.profile.clone(), MemberPower(1)));
        let resolved = node
            .resolve_host(&HostIdentity::by_address(outsider.profile.address))
            .unwrap()
            .unwrap();
        assert!(matches!(resolved, HostProfile::Intro(_)));
        assert_eq!(resolved.short_id(), ShortNodeId(20));

        let unknown = HostIdentity::by_address("10.9.0.99:7900".parse().unwrap());
        assert_eq!(node.resolve_host(&unknown).unwrap(), None);
    }

    #[tokio::test]
    async fn graceful_leave_takes_two_pulses() {
        let (node, mut cluster) = node_with_cluster(NodeConfig::default());
        let node = Arc::new(node);
        let local = node.local_id();

        let waiter = tokio::spawn({
            let node = node.clone();
            async move { node.leave_gracefully(LeaveReason(7)).await }
        });
        while node.participation() != ParticipationState::ZeroPending {
            tokio::task::yield_now().await;
        }
        let announcement = node.announce();
        assert_eq!(announcement.power, PowerRequest::ZERO);
        assert_eq!(announcement.leave, Some(LeaveReason(7)));

        finalize_trusted(&node, &mut cluster);
        let member = node.population().find(local).cloned().unwrap();
        assert!(member.power.is_zero());
        assert_eq!(node.participation(), ParticipationState::ZeroPending);

        let summary = finalize_trusted(&node, &mut cluster);
        assert!(node.population().find(local).is_none());
        assert_eq!(summary.local_state, "Left");

        waiter.await.unwrap().unwrap();
        assert_eq!(node.participation(), ParticipationState::Left);
    }

    #[tokio::test]
    async fn unconfirmed_leave_is_stuck() {
        let config = NodeConfig {
            leave_timeout: Duration::from_millis(20),
            ..NodeConfig::default()
        };
        let (node, _cluster) = node_with_cluster(config);
        let err = node.leave_gracefully(LeaveReason(1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::StuckLeave {
                reason: LeaveReason(1),
                ..
            }
        ));
    }

    #[test]
    #[should_panic(expected = "illegal state")]
    fn round_cannot_reopen_current_pulse() {
        let (node, cluster) = node_with_cluster(NodeConfig::default());
        node.begin_round(cluster.current_pulse());
    }
}
