//! Census Node
//!
//! Runs the membership consensus core for one node: every pulse it collects
//! member reports into a [`PulseRound`], admits join candidates, applies the
//! local node's announcement and commits the next census version.
//!
//! ```text
//!   pulse N ──► begin_round ──► add_report × members ──► finalize_round ──► census N
//!                                                             │
//!                        candidates, verdicts, local announcement ─┘
//! ```
//!
//! A graceful leave is two pulses long: the node first announces zero power,
//! then, once zero power was applied, it is evicted gracefully and
//! [`CensusNode::leave_gracefully`] returns.

pub mod config;
pub mod error;
pub mod node;
pub mod round;
pub mod simulation;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::{CensusNode, CensusSummary, LocalAnnouncement};
pub use round::{PulseRound, RoundOutcome, Verdict};
pub use simulation::{LocalCluster, SimulatedPeer};
