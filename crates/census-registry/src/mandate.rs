//! Mandate registry: the cloud state hash a census version is anchored to.

use census_model::{CloudStateHash, HostIdentity, HostProfile, PulseNumber};
use census_population::Population;

use crate::error::{Error, Result};

/// Holds the cloud state hash that primes a census version.
pub trait MandateRegistry: Send + Sync {
    /// Hash binding this version to its lineage.
    fn priming_cloud_hash(&self) -> CloudStateHash;

    /// Resolve a host registered by mandate.
    fn find_registered_profile(&self, identity: &HostIdentity) -> Result<Option<HostProfile>>;
}

/// A mandate registry that only carries the cloud state hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudMandateRegistry {
    cloud_hash: CloudStateHash,
}

impl CloudMandateRegistry {
    pub fn new(cloud_hash: CloudStateHash) -> Self {
        Self { cloud_hash }
    }

    /// Registry for the first census of a network.
    pub fn genesis(seed: &[u8]) -> Self {
        Self::new(CloudStateHash::genesis(seed))
    }

    /// The registry of the next census, chained to this one.
    pub fn chain_next(&self, pulse: PulseNumber, population: &Population) -> Self {
        Self::new(CloudStateHash::chain(
            &self.cloud_hash,
            pulse,
            population.digest(),
        ))
    }
}

impl MandateRegistry for CloudMandateRegistry {
    fn priming_cloud_hash(&self) -> CloudStateHash {
        self.cloud_hash
    }

    fn find_registered_profile(&self, _identity: &HostIdentity) -> Result<Option<HostProfile>> {
        Err(Error::Unsupported("profile lookup by mandate"))
    }
}
