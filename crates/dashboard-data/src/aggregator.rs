//! Group-by-count, headline figures and timeline rows over a filtered table.
//!
//! Groups come back already in display order: alphabetical for text columns,
//! numeric for years, chronological for dates, month periods and month names.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use dashboard_core::error::{DashboardError, Result};
use dashboard_core::formatting::percentage;
use dashboard_core::models::{Column, MonthPeriod, Record, Table};
use serde::Serialize;

// ── Output rows ───────────────────────────────────────────────────────────────

/// One group and the number of rows in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    /// Group labels, one per grouping column.
    pub key: Vec<String>,
    pub count: usize,
}

/// Row count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub period: MonthPeriod,
    /// `"YYYY-MM"`.
    pub label: String,
    pub count: usize,
}

/// Headline figures for a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unique_names: usize,
    pub completed: usize,
    /// Completed rows as a percentage of `total`, one decimal place.
    pub completion_rate: f64,
    pub latest_end: Option<NaiveDate>,
}

/// A row with a valid start → end span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub name: String,
    pub status: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ── GroupKey ──────────────────────────────────────────────────────────────────

/// Typed group value; its ordering is the display order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Text(String),
    Year(i32),
    Date(NaiveDate),
    Period(MonthPeriod),
    /// Month number first so names sort chronologically.
    Month(u32, String),
}

impl GroupKey {
    fn of(record: &Record, column: Column) -> Option<Self> {
        match column {
            Column::Year => record.end_year.map(GroupKey::Year),
            Column::MonthPeriod => record.end_period.map(GroupKey::Period),
            Column::MonthName => match (record.end_period, &record.end_month_name) {
                (Some(p), Some(name)) => Some(GroupKey::Month(p.month, name.clone())),
                _ => None,
            },
            Column::StartDate => record.start_date.map(GroupKey::Date),
            Column::EndDate => record.end_date.map(GroupKey::Date),
            text => record.text(text).map(|v| GroupKey::Text(v.to_string())),
        }
    }

    fn label(&self) -> String {
        match self {
            GroupKey::Text(s) => s.clone(),
            GroupKey::Year(y) => y.to_string(),
            GroupKey::Date(d) => d.format("%Y-%m-%d").to_string(),
            GroupKey::Period(p) => p.label(),
            GroupKey::Month(_, name) => name.clone(),
        }
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper that turns a [`Table`] into chart-ready rows.
pub struct Aggregator;

impl Aggregator {
    /// Count rows per value of `column`.
    ///
    /// Undated rows are left out of groupings on dates and derived columns.
    pub fn count_by(table: &Table, column: Column) -> Result<Vec<AggregateRow>> {
        ensure_column(table, column)?;

        let mut groups: BTreeMap<GroupKey, usize> = BTreeMap::new();
        for record in table.rows() {
            if let Some(key) = GroupKey::of(record, column) {
                *groups.entry(key).or_default() += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, count)| AggregateRow {
                key: vec![key.label()],
                count,
            })
            .collect())
    }

    /// Count rows per `(a, b)` value pair, ordered by `a` then `b`.
    pub fn count_by_pair(table: &Table, a: Column, b: Column) -> Result<Vec<AggregateRow>> {
        ensure_column(table, a)?;
        ensure_column(table, b)?;

        let mut groups: BTreeMap<(GroupKey, GroupKey), usize> = BTreeMap::new();
        for record in table.rows() {
            if let (Some(ka), Some(kb)) = (GroupKey::of(record, a), GroupKey::of(record, b)) {
                *groups.entry((ka, kb)).or_default() += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((ka, kb), count)| AggregateRow {
                key: vec![ka.label(), kb.label()],
                count,
            })
            .collect())
    }

    /// Chronological per-month counts of rows with an end date.
    pub fn monthly_counts(table: &Table) -> Result<Vec<MonthlyCount>> {
        ensure_column(table, Column::MonthPeriod)?;

        let mut months: BTreeMap<MonthPeriod, usize> = BTreeMap::new();
        for period in table.rows().iter().filter_map(|r| r.end_period) {
            *months.entry(period).or_default() += 1;
        }

        Ok(months
            .into_iter()
            .map(|(period, count)| MonthlyCount {
                period,
                label: period.label(),
                count,
            })
            .collect())
    }

    /// Totals, distinct names, completion rate and latest end date.
    ///
    /// A row counts as completed when its status equals one of
    /// `completed_statuses`, ignoring case.
    pub fn summary(table: &Table, completed_statuses: &[String]) -> Summary {
        let rows = table.rows();
        let total = rows.len();
        let unique_names = rows
            .iter()
            .map(|r| r.name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let completed = if table.has_column(Column::Status) {
            rows.iter()
                .filter(|r| {
                    completed_statuses
                        .iter()
                        .any(|s| s.trim().to_lowercase() == r.status.to_lowercase())
                })
                .count()
        } else {
            0
        };

        Summary {
            total,
            unique_names,
            completed,
            completion_rate: percentage(completed as f64, total as f64, 1),
            latest_end: rows.iter().filter_map(|r| r.end_date).max(),
        }
    }

    /// Rows with both dates and `end >= start`, in table order.
    pub fn timeline(table: &Table) -> Vec<TimelineEntry> {
        table
            .rows()
            .iter()
            .filter_map(|r| match (r.start_date, r.end_date) {
                (Some(start), Some(end)) if end >= start => {
                    Some(TimelineEntry {
                        name: r.name.clone(),
                        status: r.status.clone(),
                        start,
                        end,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

fn ensure_column(table: &Table, column: Column) -> Result<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(DashboardError::SchemaMismatch {
            column,
            available: table.columns().iter().map(|c| c.key().to_string()).collect(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
