//! The control feeder: what the local node asks the consensus for each pulse.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use census_model::{CapacityLevel, LeaveReason, MemberPower, OpMode, PowerRequest, PulseNumber};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Called with the profile the consensus applied to the local node.
pub type OnFinished = Arc<dyn Fn(OpMode, MemberPower, PulseNumber) + Send + Sync>;

/// Control-plane inputs and outcome callbacks of the local node.
pub trait ControlFeeder: Send + Sync {
    /// Set the capacity the node wants to contribute.
    fn set_required_power_level(&self, level: CapacityLevel);

    /// Ask the consensus to let the node leave with `reason`.
    fn set_required_graceful_leave(&self, reason: LeaveReason);

    /// The power the node announces this pulse.
    fn required_power_level(&self) -> PowerRequest;

    /// The leave the node announces this pulse, if any.
    fn required_graceful_leave(&self) -> Option<LeaveReason>;

    /// The consensus applied a profile to the local node.
    fn on_applied_membership_profile(
        &self,
        mode: OpMode,
        power: MemberPower,
        effective_since: PulseNumber,
    );

    /// The consensus accepted the node's graceful leave.
    fn on_applied_graceful_leave(&self, reason: LeaveReason, effective_since: PulseNumber);

    /// Limit traffic to `level` for `duration`.
    fn set_traffic_limit(&self, level: CapacityLevel, duration: Duration);

    /// Lift a traffic limit.
    fn resume_traffic(&self);

    /// A new pulse was observed.
    fn pulse_detected(&self);
}

#[derive(Debug, Clone, Copy)]
struct FeederState {
    capacity_level: CapacityLevel,
    leave: Option<LeaveReason>,
}

/// Base feeder holding the node operator's intent.
pub struct ConsensusControlFeeder {
    state: RwLock<FeederState>,
    on_finished: RwLock<Option<OnFinished>>,
}

impl ConsensusControlFeeder {
    /// Normal capacity, no leave requested.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FeederState {
                capacity_level: CapacityLevel::Normal,
                leave: None,
            }),
            on_finished: RwLock::new(None),
        }
    }

    /// Install the callback run for every applied membership profile.
    pub fn set_on_finished<F>(&self, f: F)
    where
        F: Fn(OpMode, MemberPower, PulseNumber) + Send + Sync + 'static,
    {
        *self.on_finished.write() = Some(Arc::new(f));
    }

    /// The configured capacity level.
    pub fn capacity_level(&self) -> CapacityLevel {
        self.state.read().capacity_level
    }
}

impl Default for ConsensusControlFeeder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsensusControlFeeder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.state.read();
        f.debug_struct("ConsensusControlFeeder")
            .field("capacity_level", &state.capacity_level)
            .field("leave", &state.leave)
            .field("on_finished", &self.on_finished.read().is_some())
            .finish()
    }
}

impl ControlFeeder for ConsensusControlFeeder {
    fn set_required_power_level(&self, level: CapacityLevel) {
        self.state.write().capacity_level = level;
        debug!(?level, "required power level set");
    }

    fn set_required_graceful_leave(&self, reason: LeaveReason) {
        self.state.write().leave = Some(reason);
        info!(%reason, "graceful leave requested");
    }

    fn required_power_level(&self) -> PowerRequest {
        PowerRequest::ByLevel(self.state.read().capacity_level)
    }

    fn required_graceful_leave(&self) -> Option<LeaveReason> {
        self.state.read().leave
    }

    fn on_applied_membership_profile(
        &self,
        mode: OpMode,
        power: MemberPower,
        effective_since: PulseNumber,
    ) {
        // Run the callback outside the lock so it may call back into the feeder.
        let callback = self.on_finished.read().clone();
        if let Some(callback) = callback {
            callback(mode, power, effective_since);
        }
    }

    fn on_applied_graceful_leave(&self, reason: LeaveReason, effective_since: PulseNumber) {
        debug!(%reason, pulse = %effective_since, "graceful leave applied");
    }

    fn set_traffic_limit(&self, _level: CapacityLevel, _duration: Duration) {
        unimplemented!("traffic limits")
    }

    fn resume_traffic(&self) {
        unimplemented!("traffic limits")
    }

    fn pulse_detected(&self) {
        unimplemented!("pulse detection")
    }
}
