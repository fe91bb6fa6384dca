//! Resolves hosts that are not part of the current online population.

use std::sync::Arc;

use census_model::{HostIdentity, HostProfile, NodeIntroProfile};
use tracing::debug;

use crate::capability::{ActiveNodeDirectory, CertificateProvider, CryptographyService};
use crate::error::{Error, Result};

/// Last-known profiles of hosts outside the online population.
pub trait OfflinePopulation: Send + Sync {
    /// `Ok(None)` when the host is unknown.
    fn find_registered_profile(&self, identity: &HostIdentity) -> Result<Option<HostProfile>>;
}

/// Resolves hosts through the active-node directory and the local certificate.
#[derive(Clone)]
pub struct DirectoryOfflinePopulation {
    directory: Arc<dyn ActiveNodeDirectory>,
    certificate: Arc<dyn CertificateProvider>,
    crypto: Arc<dyn CryptographyService>,
}

impl DirectoryOfflinePopulation {
    pub fn new(
        directory: Arc<dyn ActiveNodeDirectory>,
        certificate: Arc<dyn CertificateProvider>,
        crypto: Arc<dyn CryptographyService>,
    ) -> Self {
        Self {
            directory,
            certificate,
            crypto,
        }
    }
}

impl OfflinePopulation for DirectoryOfflinePopulation {
    fn find_registered_profile(&self, identity: &HostIdentity) -> Result<Option<HostProfile>> {
        let Some(node) = self.directory.active_node_by_address(&identity.address) else {
            debug!(host = %identity.address, "host not in active directory");
            return Ok(None);
        };

        if let Some(announced) = identity.short_id {
            if announced != node.short_id() {
                return Err(Error::IdentityMismatch {
                    announced,
                    registered: node.short_id(),
                });
            }
        }
        self.crypto.check_public_key(node.public_key())?;

        let is_discovery = self
            .certificate
            .discovery_nodes()
            .contains(&identity.address);
        Ok(Some(HostProfile::Intro(NodeIntroProfile {
            member: node,
            certificate_key: self.certificate.public_key(),
            is_discovery,
        })))
    }
}
