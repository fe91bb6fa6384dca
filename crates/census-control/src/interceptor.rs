//! Forces zero capacity while the local node is preparing to leave.
//!
//! ```text
//!            prepare_leave / leave
//!   Normal ─────────────────────────► ZeroPending
//!                                          │ applied profile: evicted
//!                                          ▼
//!                                        Left
//! ```
//!
//! Once either signal is armed the node announces zero power on every pulse,
//! whatever the base feeder is configured to. Each signal fires exactly once.

use std::sync::Arc;
use std::time::Duration;

use census_model::{CapacityLevel, LeaveReason, MemberPower, OpMode, PowerRequest, PulseNumber};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::feeder::ControlFeeder;
use crate::signal::{completion_pair, CompletionSignal, CompletionTrigger};

/// Where the local node stands in leaving the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipationState {
    /// Announcing the configured power.
    Normal,
    /// Announcing zero power, waiting for the consensus to confirm.
    ZeroPending,
    /// The consensus evicted the node; it must stop participating.
    Left,
}

#[derive(Debug, Default)]
struct InterceptState {
    has_left: bool,
    has_zero: bool,
    /// The last applied profile carried zero power.
    zero_pending: bool,
    leave_reason: LeaveReason,
    zero_ready: Option<CompletionTrigger>,
    leaving: Option<CompletionTrigger>,
}

impl InterceptState {
    fn armed(&self) -> bool {
        self.zero_ready.is_some() || self.leaving.is_some()
    }

    fn set_has_zero(&mut self) {
        if !self.has_zero {
            if let Some(trigger) = &self.zero_ready {
                trigger.fire();
                info!("zero power confirmed");
            }
        }
        self.has_zero = true;
    }

    fn set_has_left(&mut self) {
        self.set_has_zero();
        if !self.has_left {
            if let Some(trigger) = &self.leaving {
                trigger.fire();
                info!(reason = %self.leave_reason, "leave confirmed");
            }
        }
        self.has_left = true;
    }
}

/// Wraps a base feeder and overrides what must change while leaving.
#[derive(Debug)]
pub struct ControlFeederInterceptor<F> {
    base: Arc<F>,
    state: Mutex<InterceptState>,
}

impl<F: ControlFeeder> ControlFeederInterceptor<F> {
    pub fn new(base: Arc<F>) -> Self {
        Self {
            base,
            state: Mutex::new(InterceptState::default()),
        }
    }

    /// The wrapped feeder.
    pub fn base(&self) -> &Arc<F> {
        &self.base
    }

    /// Start announcing zero power. The signal fires once the consensus has
    /// applied zero power to the node.
    ///
    /// Arming again after the signal fired returns an already fired signal.
    ///
    /// # Panics
    ///
    /// If a previous preparation is still pending.
    pub fn prepare_leave(&self) -> CompletionSignal {
        let mut state = self.state.lock();
        if let Some(trigger) = &state.zero_ready {
            if !trigger.is_fired() {
                panic!("illegal state: zero power preparation already pending");
            }
            return trigger.subscribe();
        }

        let (trigger, signal) = completion_pair();
        if state.has_zero || state.zero_pending {
            state.has_zero = true;
            trigger.fire();
        }
        state.zero_ready = Some(trigger);
        info!(immediate = signal.is_complete(), "leave preparation armed");
        signal
    }

    /// Announce a graceful leave. The signal fires once the consensus has
    /// evicted the node.
    ///
    /// Arming again after the signal fired returns an already fired signal.
    ///
    /// # Panics
    ///
    /// If a previous leave is still pending.
    pub fn leave(&self, reason: LeaveReason) -> CompletionSignal {
        let mut state = self.state.lock();
        if let Some(trigger) = &state.leaving {
            if !trigger.is_fired() {
                panic!("illegal state: leave already pending");
            }
            return trigger.subscribe();
        }

        state.leave_reason = reason;
        let (trigger, signal) = completion_pair();
        if state.has_left {
            state.set_has_zero();
            trigger.fire();
        }
        state.leaving = Some(trigger);
        info!(%reason, immediate = signal.is_complete(), "leave armed");
        signal
    }

    pub fn state(&self) -> ParticipationState {
        let state = self.state.lock();
        if state.has_left {
            ParticipationState::Left
        } else if state.armed() {
            ParticipationState::ZeroPending
        } else {
            ParticipationState::Normal
        }
    }
}

impl<F: ControlFeeder> ControlFeeder for ControlFeederInterceptor<F> {
    fn set_required_power_level(&self, level: CapacityLevel) {
        self.base.set_required_power_level(level);
    }

    fn set_required_graceful_leave(&self, reason: LeaveReason) {
        self.base.set_required_graceful_leave(reason);
    }

    fn required_power_level(&self) -> PowerRequest {
        let state = self.state.lock();
        if state.armed() {
            return PowerRequest::ZERO;
        }
        self.base.required_power_level()
    }

    fn required_graceful_leave(&self) -> Option<LeaveReason> {
        let state = self.state.lock();
        if state.leaving.is_some() {
            return Some(state.leave_reason);
        }
        self.base.required_graceful_leave()
    }

    fn on_applied_membership_profile(
        &self,
        mode: OpMode,
        power: MemberPower,
        effective_since: PulseNumber,
    ) {
        {
            let mut state = self.state.lock();
            state.zero_pending = power.is_zero();
            if power.is_zero() && state.zero_ready.is_some() {
                state.set_has_zero();
            }
            if mode.is_evicted() {
                state.set_has_left();
            }
        }
        debug!(?mode, power = power.0, pulse = %effective_since, "membership profile applied");
        self.base
            .on_applied_membership_profile(mode, power, effective_since);
    }

    fn on_applied_graceful_leave(&self, reason: LeaveReason, effective_since: PulseNumber) {
        self.base.on_applied_graceful_leave(reason, effective_since);
    }

    fn set_traffic_limit(&self, level: CapacityLevel, duration: Duration) {
        self.base.set_traffic_limit(level, duration);
    }

    fn resume_traffic(&self) {
        self.base.resume_traffic();
    }

    /// Confirms a zero power that was applied before preparation was armed.
    fn pulse_detected(&self) {
        let mut state = self.state.lock();
        if state.zero_pending {
            state.set_has_zero();
        }
    }
}
