//! Filter engine.
//!
//! A [`FilterSpec`] is a conjunction of predicates. Empty set selections do
//! not restrict, set filters on columns the source did not provide are
//! skipped, and the date range applies to the end date only.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use dashboard_core::models::{Column, Record, Table};
use dashboard_core::settings::Settings;
use serde::{Deserialize, Serialize};

/// Default lower date bound when a table has no dated rows.
pub fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// User selections applied to a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Allowed project names. Empty means all.
    pub names: BTreeSet<String>,
    pub status: BTreeSet<String>,
    pub priority: BTreeSet<String>,
    pub sector: BTreeSet<String>,
    /// Case-insensitive substring matched against the assignee.
    pub text: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Keep rows without an end date.
    pub include_undated: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            names: BTreeSet::new(),
            status: BTreeSet::new(),
            priority: BTreeSet::new(),
            sector: BTreeSet::new(),
            text: String::new(),
            date_from: None,
            date_to: None,
            include_undated: true,
        }
    }
}

impl FilterSpec {
    /// Every available value selected and the full date range: the "clear
    /// filters" state.
    pub fn select_all(options: &FilterOptions, bounds: DateBounds) -> Self {
        Self {
            names: options.names.iter().cloned().collect(),
            status: options.statuses.iter().cloned().collect(),
            priority: options.priorities.iter().cloned().collect(),
            sector: options.sectors.iter().cloned().collect(),
            text: String::new(),
            date_from: Some(bounds.min),
            date_to: Some(bounds.max),
            include_undated: true,
        }
    }

    /// Clamp each date bound into `bounds`, the way a date picker limited to
    /// the data's range would.
    ///
    /// The bounds are clamped independently, so an inverted range stays
    /// inverted. Not for typed-in dates: a window lying wholly outside the
    /// data would collapse onto its first or last day.
    pub fn clamp_to(mut self, bounds: DateBounds) -> Self {
        let clamp = |d: NaiveDate| d.max(bounds.min).min(bounds.max);
        self.date_from = self.date_from.map(clamp);
        self.date_to = self.date_to.map(clamp);
        self
    }

    /// Rows of `table` matching every active predicate, in their original
    /// order. The schema is carried over.
    pub fn apply(&self, table: &Table) -> Table {
        let needle = self.text.trim().to_lowercase();
        let rows = table
            .rows()
            .iter()
            .filter(|r| self.matches(table, r, &needle))
            .cloned()
            .collect();
        table.with_rows(rows)
    }

    fn matches(&self, table: &Table, record: &Record, needle: &str) -> bool {
        let sets = [
            (Column::Name, &self.names),
            (Column::Status, &self.status),
            (Column::Priority, &self.priority),
            (Column::Sector, &self.sector),
        ];
        for (column, allowed) in sets {
            if allowed.is_empty() || !table.has_column(column) {
                continue;
            }
            if !record.text(column).is_some_and(|v| allowed.contains(v)) {
                return false;
            }
        }

        if !needle.is_empty()
            && table.has_column(Column::Assignee)
            && !(record.has_assignee() && record.assignee.to_lowercase().contains(needle))
        {
            return false;
        }

        if table.has_column(Column::EndDate) {
            return match record.end_date {
                None => self.include_undated,
                Some(end) => {
                    self.date_from.map_or(true, |from| from <= end)
                        && self.date_to.map_or(true, |to| end <= to)
                }
            };
        }

        true
    }
}

/// Selections given on the command line.
///
/// Values are trimmed and blanks dropped. Dates are used as given: a window
/// outside the data's range matches no dated row.
impl From<&Settings> for FilterSpec {
    fn from(settings: &Settings) -> Self {
        let to_set = |values: &[String]| -> BTreeSet<String> {
            values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };

        Self {
            names: to_set(&settings.project),
            status: to_set(&settings.status),
            priority: to_set(&settings.priority),
            sector: to_set(&settings.sector),
            text: settings.search.clone().unwrap_or_default(),
            date_from: settings.from,
            date_to: settings.to,
            include_undated: !settings.exclude_undated,
        }
    }
}

// ── FilterOptions ─────────────────────────────────────────────────────────────

/// Sorted distinct values offered for each set filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub names: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub sectors: Vec<String>,
}

impl FilterOptions {
    pub fn from_table(table: &Table) -> Self {
        let distinct = |column: Column| -> Vec<String> {
            if !table.has_column(column) {
                return Vec::new();
            }
            table
                .rows()
                .iter()
                .filter_map(|r| r.text(column))
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        Self {
            names: distinct(Column::Name),
            statuses: distinct(Column::Status),
            priorities: distinct(Column::Priority),
            sectors: distinct(Column::Sector),
        }
    }
}

// ── DateBounds ────────────────────────────────────────────────────────────────

/// Inclusive range of end dates present in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

/// Earliest and latest end date in `table`, or 2000-01-01 … today when no row
/// has one.
pub fn date_bounds(table: &Table) -> DateBounds {
    let mut dates = table.rows().iter().filter_map(|r| r.end_date);
    match dates.next() {
        Some(first) => {
            let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
            DateBounds { min, max }
        }
        None => DateBounds {
            min: default_min_date(),
            max: Local::now().date_naive(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
