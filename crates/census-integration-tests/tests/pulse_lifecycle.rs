//! Pulse lifecycle across the census crates.

use std::sync::Arc;

use census_admission::{CandidateFeeder, SequentialCandidateFeeder};
use census_control::{
    ConsensusControlFeeder, ControlFeeder, ControlFeederInterceptor, ParticipationState,
};
use census_model::{
    CandidateProfile, CapacityLevel, Entropy, LeaveReason, MemberPower, NodeProfile, OpMode,
    PowerRequest, PublicKey, PulseData, PulseNumber, ShortNodeId, StaticProfile, StaticRole,
};
use census_node::{CensusNode, LocalCluster, NodeConfig};
use census_population::{BitsetMapper, MembershipChange, Population};
use census_registry::{
    CloudMandateRegistry, DirectoryOfflinePopulation, Ed25519Cryptography, MandateRegistry,
    NodeDirectory, ReportingMisbehaviorRegistry, StaticCertificate, VersionedRegistries,
};
use census_stats::{StatRow, StatTable};

fn static_profile(id: u32) -> StaticProfile {
    StaticProfile {
        short_id: ShortNodeId(id),
        public_key: PublicKey([id as u8; 32]),
        address: format!("10.8.0.{}:7900", id).parse().unwrap(),
        role: StaticRole::HeavyMaterial,
    }
}

fn population(pulse: u32, ids: &[u32]) -> Population {
    Population::new(
        PulseNumber(pulse),
        ids.iter()
            .map(|&id| NodeProfile::new(static_profile(id), MemberPower(64)))
            .collect(),
        Vec::new(),
    )
    .unwrap()
}

fn genesis_census() -> VersionedRegistries {
    let crypto = Ed25519Cryptography::from_seed(&[1; 32]);
    let certificate = StaticCertificate {
        public_key: census_registry::CryptographyService::public_key(&crypto),
        discovery_nodes: Vec::new(),
    };
    VersionedRegistries::new(
        Arc::new(CloudMandateRegistry::genesis(b"integration")),
        Arc::new(ReportingMisbehaviorRegistry::new()),
        Arc::new(DirectoryOfflinePopulation::new(
            Arc::new(NodeDirectory::new()),
            Arc::new(certificate),
            Arc::new(crypto),
        )),
    )
}

#[test]
fn census_chain_over_evolving_population() {
    let genesis_pulse = PulseData::genesis(PulseNumber(65537), 10, Entropy::from_seed(b"g"));
    let pop = population(65537, &[1, 2, 3]);
    let census = genesis_census().commit_next_pulse(genesis_pulse, &pop);

    let next_pulse = genesis_pulse
        .create_next(Entropy::from_seed(b"n"), 1)
        .unwrap();
    let next_pop = pop
        .evolve(
            next_pulse.pulse_number,
            &[MembershipChange::Join(CandidateProfile::new(
                static_profile(4),
                PowerRequest::default(),
            ))],
        )
        .unwrap();

    let mandate = CloudMandateRegistry::genesis(b"integration")
        .chain_next(next_pulse.pulse_number, &next_pop);
    let a = census
        .with_mandate_registry(Arc::new(mandate))
        .commit_next_pulse(next_pulse, &next_pop);
    let b = census
        .with_mandate_registry(Arc::new(mandate))
        .commit_next_pulse(next_pulse, &next_pop);

    // same inputs, same observable content; the source version is untouched
    assert_eq!(a.version_pulse_data(), b.version_pulse_data());
    assert_eq!(
        a.mandate_registry().priming_cloud_hash(),
        b.mandate_registry().priming_cloud_hash()
    );
    assert_eq!(census.pulse(), PulseNumber(65537));
    assert_eq!(
        census.mandate_registry().priming_cloud_hash(),
        CloudMandateRegistry::genesis(b"integration").priming_cloud_hash()
    );

    let mapper = BitsetMapper::new(&next_pop);
    assert_eq!(mapper.len(), 4);
    for (index, node) in next_pop.online().iter().enumerate() {
        assert_eq!(mapper.index_of(node.short_id()), Some(index));
        assert_eq!(mapper.id_at(index), Some(node.short_id()));
    }
}

#[test]
fn candidate_removal_precondition() {
    let mut feeder = SequentialCandidateFeeder::new();
    assert!(!feeder.remove_join_candidate(false, ShortNodeId(5)));

    feeder.add_join_candidate(CandidateProfile::new(
        static_profile(5),
        PowerRequest::default(),
    ));
    assert_eq!(
        feeder.pick_next_join_candidate().map(|c| c.short_id()),
        Some(ShortNodeId(5))
    );
    assert!(feeder.remove_join_candidate(true, ShortNodeId(5)));
    assert!(feeder.is_empty());
    assert!(!feeder.remove_join_candidate(true, ShortNodeId(5)));
}

#[test]
fn leave_reports_zero_until_evicted() {
    let control = ControlFeederInterceptor::new(Arc::new(ConsensusControlFeeder::new()));
    control.set_required_power_level(CapacityLevel::Max);
    let left = control.leave(LeaveReason(3));

    for pulse in [65547, 65557, 65567] {
        assert_eq!(control.required_power_level(), PowerRequest::ZERO);
        control.set_required_power_level(CapacityLevel::Max);
        control.on_applied_membership_profile(
            OpMode::Normal,
            MemberPower::ZERO,
            PulseNumber(pulse),
        );
        assert!(!left.is_complete());
    }

    control.on_applied_membership_profile(
        OpMode::EvictedGracefully,
        MemberPower::ZERO,
        PulseNumber(65577),
    );
    assert!(left.is_complete());
    assert_eq!(control.state(), ParticipationState::Left);

    // a repeated eviction does not fire again
    control.on_applied_membership_profile(
        OpMode::EvictedGracefully,
        MemberPower::ZERO,
        PulseNumber(65587),
    );
    assert!(left.is_complete());
}

#[test]
#[should_panic(expected = "illegal state")]
fn second_leave_before_completion_is_fatal() {
    let control = ControlFeederInterceptor::new(Arc::new(ConsensusControlFeeder::new()));
    let _first = control.leave(LeaveReason(1));
    let _second = control.leave(LeaveReason(2));
}

#[test]
fn stat_table_end_to_end() {
    let mut table = StatTable::new(3, 2);
    let index = table.add_row(StatRow::from_values(3, &[1, 2]));
    assert_eq!(table.summary_by_value(1), 1);
    assert_eq!(table.summary_by_value(2), 1);

    table.remove_row(index);
    assert_eq!(table.summary_by_value(1), 0);
    assert_eq!(table.summary_by_value(2), 0);
}

fn start_node(config: NodeConfig) -> (Arc<CensusNode>, LocalCluster) {
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
    (Arc::new(node), cluster)
}

#[test]
fn simulated_cluster_admits_joiners() {
    let (node, mut cluster) = start_node(NodeConfig::default());
    let genesis_hash = node.census().mandate_registry().priming_cloud_hash();

    for _ in 0..6 {
        assert!(cluster.step(&node).unwrap());
    }

    // join requests arrive on pulses 3 and 6 and are admitted the same pulse
    assert_eq!(node.population().online_count(), 6);
    assert!(node.population().is_online(ShortNodeId(5)));
    assert!(node.population().is_online(ShortNodeId(6)));
    assert_eq!(node.pulse(), PulseNumber(65537 + 60));
    assert_ne!(node.census().mandate_registry().priming_cloud_hash(), genesis_hash);
    assert_eq!(node.misbehavior().report_count(), 0);
}

#[tokio::test]
async fn node_leaves_while_pulses_continue() {
    let (node, mut cluster) = start_node(NodeConfig::default());
    let local = node.local_id();

    let driver = {
        let node = node.clone();
        tokio::spawn(async move {
            while node.participation() != ParticipationState::Left {
                if !cluster.step(&node).unwrap() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    node.leave_gracefully(LeaveReason(9)).await.unwrap();
    driver.await.unwrap();

    assert_eq!(node.participation(), ParticipationState::Left);
    assert!(node.population().find(local).is_none());
    // zero power on the first pulse, evicted on the second
    assert_eq!(node.pulse(), PulseNumber(65557));
    assert_eq!(node.population().online_count(), 3);
}
