//! Misbehavior reports.
//!
//! The registry observes reports and forwards them; scoring and punishment
//! belong to the operator's tooling.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use census_model::{HostAddress, PulseNumber, ShortNodeId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Behavior that breaks the protocol without proving intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlameKind {
    /// A packet arrived for a pulse other than the current one.
    MismatchedPulse,
    /// A report arrived after the round closed.
    LateReport,
    /// A packet broke the round's message rules.
    ProtocolViolation,
}

/// Provable misbehavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FraudKind {
    /// Two different signed announcements for the same pulse.
    ConflictingAnnouncements,
    /// A host claimed an identity registered to another host.
    MismatchedIdentity,
    /// A signature that does not verify against the registered key.
    InvalidSignature,
    /// A quorum of members voted the host fraudulent.
    QuorumVerdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Misbehavior {
    Blame(BlameKind),
    Fraud(FraudKind),
}

impl Misbehavior {
    pub fn is_fraud(&self) -> bool {
        matches!(self, Self::Fraud(_))
    }
}

impl fmt::Display for Misbehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blame(kind) => write!(f, "blame:{:?}", kind),
            Self::Fraud(kind) => write!(f, "fraud:{:?}", kind),
        }
    }
}

/// An observed protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisbehaviorReport {
    pub violator: ShortNodeId,
    pub violator_host: Option<HostAddress>,
    pub kind: Misbehavior,
    pub pulse: PulseNumber,
    pub details: String,
}

impl MisbehaviorReport {
    pub fn new(violator: ShortNodeId, kind: Misbehavior, pulse: PulseNumber) -> Self {
        Self {
            violator,
            violator_host: None,
            kind,
            pulse,
            details: String::new(),
        }
    }

    pub fn with_host(mut self, host: HostAddress) -> Self {
        self.violator_host = Some(host);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Sink for misbehavior reports.
pub trait MisbehaviorRegistry: Send + Sync {
    fn add_report(&self, report: MisbehaviorReport);
}

/// Logs every report, counts it and optionally forwards it.
#[derive(Debug, Default)]
pub struct ReportingMisbehaviorRegistry {
    reports: AtomicU64,
    frauds: AtomicU64,
    sink: Option<mpsc::UnboundedSender<MisbehaviorReport>>,
}

impl ReportingMisbehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward reports to `sink` as well.
    pub fn with_sink(sink: mpsc::UnboundedSender<MisbehaviorReport>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Reports received so far.
    pub fn report_count(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// Fraud reports received so far.
    pub fn fraud_count(&self) -> u64 {
        self.frauds.load(Ordering::Relaxed)
    }
}

impl MisbehaviorRegistry for ReportingMisbehaviorRegistry {
    fn add_report(&self, report: MisbehaviorReport) {
        warn!(
            violator = %report.violator,
            host = ?report.violator_host,
            kind = %report.kind,
            pulse = %report.pulse,
            details = %report.details,
            "misbehavior reported"
        );
        self.reports.fetch_add(1, Ordering::Relaxed);
        if report.kind.is_fraud() {
            self.frauds.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(sink) = &self.sink {
            if sink.send(report).is_err() {
                debug!("misbehavior sink closed, report dropped");
            }
        }
    }
}
