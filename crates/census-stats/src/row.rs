//! One reporting member's observations.

use std::fmt;

/// A fixed-width row of small values with a per-value count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    row_index: Option<usize>,
    values: Vec<u8>,
    /// `summary[v]` = number of columns holding `v`.
    summary: Vec<u16>,
}

impl StatRow {
    /// A row of `columns` zeros accepting values `0..=max_value`.
    ///
    /// # Panics
    ///
    /// If `columns` exceeds `u16::MAX`.
    pub fn new(max_value: u8, columns: usize) -> Self {
        assert!(columns <= usize::from(u16::MAX), "too many columns");
        let mut summary = vec![0u16; usize::from(max_value) + 1];
        summary[0] = columns as u16;
        Self {
            row_index: None,
            values: vec![0; columns],
            summary,
        }
    }

    /// Build a row from explicit values.
    ///
    /// # Panics
    ///
    /// If a value exceeds `max_value` or there are more than `u16::MAX` values.
    pub fn from_values(max_value: u8, values: &[u8]) -> Self {
        let mut row = Self::new(max_value, values.len());
        for (column, &value) in values.iter().enumerate() {
            row.set(column, value);
        }
        row
    }

    pub fn max_value(&self) -> u8 {
        (self.summary.len() - 1) as u8
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    /// Position in the table, once the row was added to one.
    pub fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    pub(crate) fn attach(&mut self, index: usize) {
        self.row_index = Some(index);
    }

    pub(crate) fn detach(&mut self) {
        self.row_index = None;
    }

    /// # Panics
    ///
    /// If `column` is out of range.
    pub fn get(&self, column: usize) -> u8 {
        self.values[column]
    }

    /// Set a cell and return its previous value.
    ///
    /// # Panics
    ///
    /// If `column` is out of range or `value > max_value()`.
    pub fn set(&mut self, column: usize, value: u8) -> u8 {
        assert!(
            value <= self.max_value(),
            "value {} exceeds max value {}",
            value,
            self.max_value()
        );
        let old = std::mem::replace(&mut self.values[column], value);
        self.summary[usize::from(old)] -= 1;
        self.summary[usize::from(value)] += 1;
        old
    }

    /// Number of cells holding `value`.
    pub fn summary_by_value(&self, value: u8) -> u16 {
        self.summary[usize::from(value)]
    }

    pub fn summary(&self) -> &[u16] {
        &self.summary
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub(crate) fn ensure_for_table(&self, max_value: u8, columns: usize) {
        if self.max_value() != max_value || self.column_count() != columns {
            panic!(
                "row does not belong to this table: row v={} c={}, table v={} c={}",
                self.max_value(),
                self.column_count(),
                max_value,
                columns
            );
        }
    }
}

impl fmt::Display for StatRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_index {
            Some(index) => write!(f, "{:03}", index)?,
            None => write!(f, "###")?,
        }
        for value in &self.values {
            write!(f, "|{}", value)?;
        }
        write!(f, "|∑{}", crate::table::format_counts(&self.summary))
    }
}
