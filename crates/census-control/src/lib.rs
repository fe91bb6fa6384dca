//! Census Control
//!
//! The local node's participation state machine.
//!
//! [`ConsensusControlFeeder`] holds what the operator asked for: a capacity
//! level and an optional graceful leave. [`ControlFeederInterceptor`] wraps it
//! and takes over while the node is leaving: it announces zero power and
//! hands out [`CompletionSignal`]s that fire when the consensus confirms zero
//! power or eviction.
//!
//! ```no_run
//! use std::sync::Arc;
//! use census_control::{ConsensusControlFeeder, ControlFeederInterceptor};
//! use census_model::LeaveReason;
//!
//! # async fn run() {
//! let control = ControlFeederInterceptor::new(Arc::new(ConsensusControlFeeder::new()));
//! let left = control.leave(LeaveReason(0));
//! // ... the round driver applies profiles as pulses pass ...
//! left.wait().await.ok();
//! # }
//! ```

mod feeder;
mod interceptor;
mod signal;

pub use feeder::{ConsensusControlFeeder, ControlFeeder, OnFinished};
pub use interceptor::{ControlFeederInterceptor, ParticipationState};
pub use signal::{completion_pair, CompletionSignal, CompletionTrigger, SignalDropped};
