//! The versioned census: registries bound to one pulse.

use std::fmt;
use std::sync::Arc;

use census_model::{PulseData, PulseNumber};
use census_population::Population;
use tracing::debug;

use crate::mandate::MandateRegistry;
use crate::misbehavior::MisbehaviorRegistry;
use crate::offline::OfflinePopulation;

/// Registries valid for one pulse.
///
/// A published version is never mutated. [`commit_next_pulse`] returns the
/// next version and shares the registries with it; replacing a registry is an
/// explicit `with_*` call that also returns a new value.
///
/// [`commit_next_pulse`]: VersionedRegistries::commit_next_pulse
#[derive(Clone)]
pub struct VersionedRegistries {
    mandate: Arc<dyn MandateRegistry>,
    misbehavior: Arc<dyn MisbehaviorRegistry>,
    offline: Arc<dyn OfflinePopulation>,
    pulse_data: PulseData,
}

impl VersionedRegistries {
    /// The genesis version. Its pulse data is unset until the first commit.
    pub fn new(
        mandate: Arc<dyn MandateRegistry>,
        misbehavior: Arc<dyn MisbehaviorRegistry>,
        offline: Arc<dyn OfflinePopulation>,
    ) -> Self {
        Self {
            mandate,
            misbehavior,
            offline,
            pulse_data: PulseData::default(),
        }
    }

    /// The version for `pulse_data`, sharing this version's registries.
    ///
    /// # Panics
    ///
    /// If `pulse_data` is not valid, or if its pulse does not follow the pulse
    /// of this version.
    pub fn commit_next_pulse(&self, pulse_data: PulseData, online: &Population) -> Self {
        pulse_data.ensure_pulse_data();
        let current = self.pulse_data.pulse_number;
        assert!(
            current.is_unknown() || pulse_data.pulse_number > current,
            "illegal state: census of pulse {} cannot follow pulse {}",
            pulse_data.pulse_number,
            current
        );

        debug!(
            pulse = %pulse_data.pulse_number,
            online = online.online_count(),
            "census committed"
        );
        Self {
            pulse_data,
            ..self.clone()
        }
    }

    pub fn mandate_registry(&self) -> &Arc<dyn MandateRegistry> {
        &self.mandate
    }

    pub fn misbehavior_registry(&self) -> &Arc<dyn MisbehaviorRegistry> {
        &self.misbehavior
    }

    pub fn offline_population(&self) -> &Arc<dyn OfflinePopulation> {
        &self.offline
    }

    pub fn version_pulse_data(&self) -> PulseData {
        self.pulse_data
    }

    /// Shorthand for the pulse number of [`version_pulse_data`](Self::version_pulse_data).
    pub fn pulse(&self) -> PulseNumber {
        self.pulse_data.pulse_number
    }

    pub fn with_mandate_registry(&self, mandate: Arc<dyn MandateRegistry>) -> Self {
        Self {
            mandate,
            ..self.clone()
        }
    }

    pub fn with_misbehavior_registry(&self, misbehavior: Arc<dyn MisbehaviorRegistry>) -> Self {
        Self {
            misbehavior,
            ..self.clone()
        }
    }

    pub fn with_offline_population(&self, offline: Arc<dyn OfflinePopulation>) -> Self {
        Self {
            offline,
            ..self.clone()
        }
    }
}

impl fmt::Debug for VersionedRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedRegistries")
            .field("pulse_data", &self.pulse_data)
            .field("cloud_hash", &self.mandate.priming_cloud_hash())
            .finish_non_exhaustive()
    }
}
