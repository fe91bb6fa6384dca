//! A local simulated cluster for the `census-node` binary.
//!
//! Peers are in-process key pairs. Every pulse each online peer reports that
//! it trusts every member, and every few pulses a new candidate asks to join.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use census_model::{
    CandidateProfile, Entropy, NodeProfile, PowerRequest, PulseData, PulseNumber,
    ShortNodeId, StaticProfile, StaticRole,
};
use census_population::{MemberVote, Population, VoteBitset};
use census_registry::{CryptographyService, Ed25519Cryptography};
use rand::Rng;

use crate::config::NodeConfig;
use crate::error::Result;
use crate::node::CensusNode;
use crate::round::PulseRound;

/// Pulse distance used by the simulated pulse source.
pub const PULSE_DELTA: u16 = 10;

/// Pulses between two simulated join requests.
const JOIN_EVERY: u32 = 3;

/// A simulated peer.
pub struct SimulatedPeer {
    pub profile: StaticProfile,
    pub crypto: Ed25519Cryptography,
}

impl SimulatedPeer {
    /// A peer with a random key.
    pub fn generate(id: ShortNodeId, address: SocketAddr) -> Self {
        let seed: [u8; 32] = rand::thread_rng().gen();
        let crypto = Ed25519Cryptography::from_seed(&seed);
        let profile = StaticProfile {
            short_id: id,
            public_key: crypto.public_key(),
            address,
            role: StaticRole::LightMaterial,
        };
        Self { profile, crypto }
    }

    /// Signature over the peer's intro bytes.
    pub fn sign_intro(&self) -> [u8; 64] {
        self.crypto.sign(&self.profile.intro_bytes())
    }
}

/// The local node's view of the simulated network.
pub struct LocalCluster {
    peers: Vec<SimulatedPeer>,
    next_id: u32,
    pulse: PulseData,
    pulses: u32,
}

impl LocalCluster {
    /// A cluster of `config.simulated_peers` peers; peer `#1` is the local node
    /// and listens on `config.bind_addr`.
    pub fn new(config: &NodeConfig) -> Self {
        let count = u32::try_from(config.simulated_peers.max(1)).unwrap_or(u32::MAX);
        let peers: Vec<_> = (1..=count)
            .map_while(|id| {
                let address = peer_address(config.bind_addr, id)?;
                Some(SimulatedPeer::generate(ShortNodeId(id), address))
            })
            .collect();
        if peers.len() < config.simulated_peers {
            tracing::warn!(
                requested = config.simulated_peers,
                simulated = peers.len(),
                "not enough ports above {} for every simulated peer",
                config.bind_addr
            );
        }
        // at most `count` peers, so this fits
        let next_id = peers.len() as u32 + 1;
        let pulse = PulseData {
            timestamp: unix_now(),
            ..PulseData::genesis(
                PulseNumber::MIN_TIME_PULSE,
                PULSE_DELTA,
                Entropy::from_seed(config.network.as_bytes()),
            )
        };
        Self {
            peers,
            next_id,
            pulse,
            pulses: 0,
        }
    }

    /// The genesis population: every peer online at normal power.
    pub fn genesis_population(&self) -> Result<Population> {
        let members = self
            .peers
            .iter()
            .map(|p| NodeProfile::new(p.profile.clone(), PowerRequest::default().power()))
            .collect();
        Ok(Population::new(self.pulse.pulse_number, members, Vec::new())?)
    }

    /// The pulse the source is at; the genesis pulse before the first step.
    pub fn current_pulse(&self) -> PulseData {
        self.pulse
    }

    /// Take the local peer out of the cluster to start a node with it.
    pub fn local_peer(&mut self) -> SimulatedPeer {
        self.peers.remove(0)
    }

    /// Advance the pulse source. Returns `None` when pulse numbers run out.
    pub fn next_pulse(&mut self) -> Option<PulseData> {
        let pulse_number = self.pulse.pulse_number.get();
        let entropy = Entropy::from_seed(&pulse_number.to_le_bytes());
        self.pulse = self.pulse.create_next(entropy, unix_now())?;
        self.pulses += 1;
        Some(self.pulse)
    }

    /// Every online member reports full trust.
    pub fn fill_round(&self, round: &mut PulseRound) -> Result<()> {
        let mut votes = VoteBitset::new(round.mapper());
        for index in 0..votes.len() {
            votes.set(index, MemberVote::Trusted);
        }
        let reporters: Vec<_> = round.mapper().ids().to_vec();
        for reporter in reporters {
            round.add_report(reporter, &votes)?;
        }
        Ok(())
    }

    /// A new peer asking to join, every few pulses. Stops once the ports above
    /// `base` run out.
    pub fn join_request(&mut self, base: SocketAddr) -> Option<(CandidateProfile, [u8; 64])> {
        if self.pulses % JOIN_EVERY != 0 {
            return None;
        }
        let address = peer_address(base, self.next_id)?;
        let id = ShortNodeId(self.next_id);
        self.next_id += 1;
        let peer = SimulatedPeer::generate(id, address);
        let signature = peer.sign_intro();
        let candidate = CandidateProfile::new(peer.profile.clone(), PowerRequest::default());
        self.peers.push(peer);
        Some((candidate, signature))
    }

    /// Drive one pulse of `node`. Returns `false` once pulse numbers run out.
    pub fn step(&mut self, node: &CensusNode) -> Result<bool> {
        let Some(pulse) = self.next_pulse() else {
            return Ok(false);
        };
        if let Some((candidate, signature)) = self.join_request(node.config().bind_addr) {
            node.add_join_candidate(candidate, &signature)?;
        }
        let mut round = node.begin_round(pulse);
        self.fill_round(&mut round)?;
        let summary = node.finalize_round(round)?;
        if node.config().summary_json {
            println!("{}", serde_json::to_string(&summary)?);
        }
        Ok(true)
    }
}

impl std::fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("peers", &self.peers.len())
            .field("pulse", &self.pulse)
            .finish()
    }
}

/// Peer `#id` listens `id - 1` ports above `base`.
fn peer_address(base: SocketAddr, id: u32) -> Option<SocketAddr> {
    let offset = u16::try_from(id.checked_sub(1)?).ok()?;
    let port = base.port().checked_add(offset)?;
    Some(SocketAddr::new(base.ip(), port))
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}
