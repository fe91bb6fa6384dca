//! Census Stats
//!
//! Per-round agreement statistics.
//!
//! Each reporting member contributes a [`StatRow`] of small values, one per
//! observation column. The [`StatTable`] keeps value counts per column and for
//! the whole table up to date as rows come and go, so the round driver can ask
//! "did a quorum report value v for column c" in O(1).
//!
//! # Quorum
//!
//! A round of `n` members tolerates `f = (n - 1) / 3` faulty reporters and
//! needs `n - f` matching reports.

mod column;
mod quorum;
mod row;
mod table;

pub use column::StatColumn;
pub use quorum::{consensus_threshold, max_faulty, meets_threshold, votes_needed};
pub use row::StatRow;
pub use table::StatTable;
