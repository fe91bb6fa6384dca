//! Per-column summaries.

use crate::quorum;

/// Counts of each value within one observation column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatColumn {
    index: u16,
    summary: Vec<u32>,
}

impl StatColumn {
    pub(crate) fn new(index: u16, max_value: u8) -> Self {
        Self {
            index,
            summary: vec![0; usize::from(max_value) + 1],
        }
    }

    pub fn index(&self) -> usize {
        usize::from(self.index)
    }

    /// Number of present rows holding `value` in this column.
    pub fn summary_by_value(&self, value: u8) -> u32 {
        self.summary[usize::from(value)]
    }

    pub fn summary(&self) -> &[u32] {
        &self.summary
    }

    /// Whether `value` was reported by a quorum of `members`.
    pub fn has_quorum(&self, value: u8, members: usize) -> bool {
        quorum::meets_threshold(self.summary_by_value(value) as usize, members)
    }

    pub(crate) fn increment(&mut self, value: u8) {
        self.summary[usize::from(value)] += 1;
    }

    pub(crate) fn decrement(&mut self, value: u8) {
        self.summary[usize::from(value)] -= 1;
    }
}
