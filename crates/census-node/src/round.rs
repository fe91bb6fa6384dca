//! One pulse's agreement on the member set.
//!
//! Every online member reports a [`VoteBitset`] about every other member. The
//! reports become rows of a [`StatTable`] with one column per member; a member
//! whose column reaches the consensus threshold for a vote gets that verdict.

use std::collections::HashMap;

use census_model::{MemberPower, OpMode, PulseData, PulseNumber, ShortNodeId};
use census_population::{BitsetMapper, MemberVote, MembershipChange, Population, VoteBitset};
use census_stats::StatTable;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;

/// Round-level decision about one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    /// No vote reached the threshold.
    Undecided,
    Trusted,
    /// A quorum found the member unresponsive; it goes offline.
    Suspected,
    /// A quorum found the member fraudulent; it is evicted.
    Fraud,
}

/// Verdicts of a finished round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub pulse: PulseNumber,
    pub reporters: usize,
    /// One entry per online member, ascending by short id.
    pub verdicts: Vec<(ShortNodeId, Verdict)>,
}

impl RoundOutcome {
    pub fn verdict(&self, id: ShortNodeId) -> Option<Verdict> {
        self.verdicts
            .iter()
            .find(|(member, _)| *member == id)
            .map(|(_, verdict)| *verdict)
    }

    /// Members that received `verdict`.
    pub fn with_verdict(&self, verdict: Verdict) -> Vec<ShortNodeId> {
        self.verdicts
            .iter()
            .filter(|(_, v)| *v == verdict)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Population changes the verdicts imply.
    pub fn changes(&self) -> Vec<MembershipChange> {
        self.verdicts
            .iter()
            .filter_map(|(id, verdict)| match verdict {
                Verdict::Fraud => Some(MembershipChange::Update {
                    id: *id,
                    mode: OpMode::EvictedAsFraud,
                    power: MemberPower::ZERO,
                }),
                Verdict::Suspected => Some(MembershipChange::GoOffline(*id)),
                Verdict::Undecided | Verdict::Trusted => None,
            })
            .collect()
    }
}

/// Collects member reports for one pulse.
#[derive(Debug, Clone)]
pub struct PulseRound {
    pulse: PulseData,
    mapper: BitsetMapper,
    table: StatTable,
    /// Reporter -> row index.
    reporters: HashMap<ShortNodeId, usize>,
}

impl PulseRound {
    /// A round for `pulse` over the online members of `population`.
    pub fn new(pulse: PulseData, population: &Population) -> Self {
        let mapper = BitsetMapper::new(population);
        let table = StatTable::new(MemberVote::MAX_VALUE, mapper.len());
        Self {
            pulse,
            mapper,
            table,
            reporters: HashMap::new(),
        }
    }

    pub fn pulse_data(&self) -> PulseData {
        self.pulse
    }

    pub fn pulse(&self) -> PulseNumber {
        self.pulse.pulse_number
    }

    /// The mapping reports must be encoded with.
    pub fn mapper(&self) -> &BitsetMapper {
        &self.mapper
    }

    pub fn table(&self) -> &StatTable {
        &self.table
    }

    pub fn reporter_count(&self) -> usize {
        self.reporters.len()
    }

    /// Record `reporter`'s votes, replacing an earlier report from it.
    ///
    /// Fails if the reporter is not an online member or the votes were
    /// encoded for another population version.
    pub fn add_report(&mut self, reporter: ShortNodeId, votes: &VoteBitset) -> Result<()> {
        let index = self
            .mapper
            .index_of(reporter)
            .ok_or(census_population::Error::UnknownNode(reporter))?;
        if votes.version() != self.mapper.version() {
            return Err(census_population::Error::VersionMismatch {
                expected: self.mapper.version(),
                found: votes.version(),
            }
            .into());
        }

        let mut row = self.table.new_row();
        for (column, vote) in votes.iter().enumerate() {
            row.set(column, vote.bits());
        }
        if self.table.remove_row(index).is_some() {
            debug!(%reporter, pulse = %self.pulse(), "report replaced");
        }
        self.table.put_row(index, row);
        self.reporters.insert(reporter, index);
        trace!(%reporter, pulse = %self.pulse(), "report added");
        Ok(())
    }

    /// Withdraw `reporter`'s votes. Returns whether it had reported.
    pub fn retract_report(&mut self, reporter: ShortNodeId) -> bool {
        let Some(index) = self.reporters.remove(&reporter) else {
            return false;
        };
        self.table.remove_row(index).is_some()
    }

    /// Verdicts from the reports collected so far.
    ///
    /// Thresholds are taken over the whole online population, so missing
    /// reports count against every verdict.
    pub fn decide(&self) -> RoundOutcome {
        let members = self.mapper.len();
        let verdicts = self
            .table
            .columns()
            .iter()
            .filter_map(|column| {
                let id = self.mapper.id_at(column.index())?;
                let verdict = if column.has_quorum(MemberVote::Fraud.bits(), members) {
                    Verdict::Fraud
                } else if column.has_quorum(MemberVote::Doubted.bits(), members) {
                    Verdict::Suspected
                } else if column.has_quorum(MemberVote::Trusted.bits(), members) {
                    Verdict::Trusted
                } else {
                    Verdict::Undecided
                };
                Some((id, verdict))
            })
            .collect();

        RoundOutcome {
            pulse: self.pulse(),
            reporters: self.reporter_count(),
            verdicts,
        }
    }

    /// The stat table rendered with vote names, for debug logs.
    pub fn render(&self) -> String {
        let header = format!("pulse {}", self.pulse());
        self.table
            .table_fmt(&header, |v| format!("{:?}", MemberVote::from_bits(v)))
    }
}
