//! The per-round statistics matrix.
//!
//! Rows are reporting members, columns are observation slots, cells are small
//! values `0..=max_value`. Value counts per column and for the whole table are
//! maintained on every row insertion and removal, never recomputed.

use std::fmt::{self, Write};

use crate::column::StatColumn;
use crate::row::StatRow;

/// Renders `[c0 c1 ...]`.
pub(crate) fn format_counts<T: fmt::Display>(counts: &[T]) -> String {
    let mut out = String::from("[");
    for (i, count) in counts.iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", count);
    }
    out.push(']');
    out
}

/// Renders `[name(0):c0 name(1):c1 ...]`.
fn format_named_counts<T: fmt::Display>(counts: &[T], name: &dyn Fn(u8) -> String) -> String {
    let mut out = String::from("[");
    for (i, count) in counts.iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}:{}", name(i as u8), count);
    }
    out.push(']');
    out
}

/// Dense matrix of per-member observations for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTable {
    columns: Vec<StatColumn>,
    /// `None` marks a slot whose row was removed or never put.
    rows: Vec<Option<StatRow>>,
    row_count: usize,
    summary: Vec<u32>,
}

impl StatTable {
    /// An empty table for values `0..=max_value` over `columns` columns.
    ///
    /// # Panics
    ///
    /// If `columns` exceeds `u16::MAX`.
    pub fn new(max_value: u8, columns: usize) -> Self {
        assert!(columns <= usize::from(u16::MAX), "too many columns");
        Self {
            columns: (0..columns)
                .map(|i| StatColumn::new(i as u16, max_value))
                .collect(),
            rows: Vec::with_capacity(columns),
            row_count: 0,
            summary: vec![0; usize::from(max_value) + 1],
        }
    }

    /// An all-zero row shaped for this table.
    pub fn new_row(&self) -> StatRow {
        StatRow::new(self.max_value(), self.column_count())
    }

    pub fn max_value(&self) -> u8 {
        (self.summary.len() - 1) as u8
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of present rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of row slots, including empty ones.
    pub fn slot_count(&self) -> usize {
        self.rows.len()
    }

    /// Append a row and return its index.
    ///
    /// # Panics
    ///
    /// If the row's shape does not match the table.
    pub fn add_row(&mut self, mut row: StatRow) -> usize {
        row.ensure_for_table(self.max_value(), self.column_count());
        let index = self.rows.len();
        row.attach(index);
        self.count_in(&row);
        self.rows.push(Some(row));
        self.row_count += 1;
        index
    }

    /// Place a row at `index`, growing the table with empty slots as needed.
    ///
    /// # Panics
    ///
    /// If the row's shape does not match the table or the slot is occupied.
    pub fn put_row(&mut self, index: usize, mut row: StatRow) {
        row.ensure_for_table(self.max_value(), self.column_count());
        if index >= self.rows.len() {
            self.rows.resize_with(index + 1, || None);
        } else if self.rows[index].is_some() {
            panic!("row is in use");
        }
        row.attach(index);
        self.count_in(&row);
        self.rows[index] = Some(row);
        self.row_count += 1;
    }

    pub fn get_row(&self, index: usize) -> Option<&StatRow> {
        self.rows.get(index)?.as_ref()
    }

    /// Retract the row at `index`, returning it. `None` for an empty slot.
    pub fn remove_row(&mut self, index: usize) -> Option<StatRow> {
        let mut row = self.rows.get_mut(index)?.take()?;
        for (column, &value) in self.columns.iter_mut().zip(row.values()) {
            column.decrement(value);
            self.summary[usize::from(value)] -= 1;
        }
        self.row_count -= 1;
        row.detach();
        Some(row)
    }

    fn count_in(&mut self, row: &StatRow) {
        for (column, &value) in self.columns.iter_mut().zip(row.values()) {
            column.increment(value);
            self.summary[usize::from(value)] += 1;
        }
    }

    /// Number of present cells holding `value`.
    ///
    /// # Panics
    ///
    /// If `value > max_value()`.
    pub fn summary_by_value(&self, value: u8) -> u32 {
        self.summary[usize::from(value)]
    }

    pub fn summary(&self) -> &[u32] {
        &self.summary
    }

    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn column(&self, index: usize) -> &StatColumn {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[StatColumn] {
        &self.columns
    }

    /// Present rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = &StatRow> {
        self.rows.iter().flatten()
    }

    /// Plain-number rendering for logs.
    pub fn as_text(&self, header: &str) -> String {
        self.render(header, None)
    }

    /// Rendering with a name for each value, prefixed with a legend.
    pub fn table_fmt<F>(&self, header: &str, value_name: F) -> String
    where
        F: Fn(u8) -> String,
    {
        self.render(header, Some(&value_name))
    }

    fn render(&self, header: &str, value_name: Option<&dyn Fn(u8) -> String>) -> String {
        let mut out = String::new();
        if let Some(name) = value_name {
            let legend: Vec<String> = (0..=self.max_value()).map(name).collect();
            let _ = write!(out, "LEGEND [{}] ", legend.join(" "));
        }
        out.push_str(header);
        out.push_str("\n###");

        let mut widths = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let cell = format!("|{:03}{}", column.index(), format_counts(column.summary()));
            widths.push(cell.chars().count());
            out.push_str(&cell);
        }
        out.push_str("|∑");
        match value_name {
            Some(name) => out.push_str(&format_named_counts(&self.summary, name)),
            None => out.push_str(&format_counts(&self.summary)),
        }
        out.push('\n');

        for (index, row) in self.rows.iter().enumerate() {
            let Some(row) = row else { continue };
            let _ = write!(out, "{:03}", index);
            for (&value, &width) in row.values().iter().zip(&widths) {
                let cell = match value_name {
                    Some(name) => name(value),
                    None => value.to_string(),
                };
                let _ = write!(out, "|{:>w$}", cell, w = width - 1);
            }
            out.push_str("|∑");
            match value_name {
                Some(name) => out.push_str(&format_named_counts(row.summary(), name)),
                None => out.push_str(&format_counts(row.summary())),
            }
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for StatTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stats[v={}, c={}, r={}/{}]",
            usize::from(self.max_value()) + 1,
            self.column_count(),
            self.row_count(),
            self.slot_count()
        )
    }
}
