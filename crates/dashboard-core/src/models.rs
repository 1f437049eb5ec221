use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Placeholder for an absent categorical value.
pub const NOT_DEFINED: &str = "Not Defined";

/// Placeholder for an absent project name.
///
/// Kept distinct from [`NOT_DEFINED`] so unnamed rows never merge with other
/// placeholder groups.
pub const UNNAMED: &str = "(unnamed)";

// ── Column ────────────────────────────────────────────────────────────────────

/// Canonical column identifiers understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Name,
    Status,
    Priority,
    Assignee,
    Sector,
    StartDate,
    EndDate,
    /// Calendar year of the end date.
    Year,
    /// End date truncated to (year, month).
    MonthPeriod,
    /// Localized month name of the end date.
    MonthName,
}

impl Column {
    /// Columns read from a source, in display order.
    pub const SOURCE: [Column; 7] = [
        Column::Name,
        Column::Status,
        Column::Priority,
        Column::Assignee,
        Column::Sector,
        Column::StartDate,
        Column::EndDate,
    ];

    /// Columns filled with a sentinel when absent.
    pub const CATEGORICAL: [Column; 5] = [
        Column::Name,
        Column::Status,
        Column::Priority,
        Column::Assignee,
        Column::Sector,
    ];

    /// Canonical key used in alias files and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Status => "status",
            Column::Priority => "priority",
            Column::Assignee => "assignee",
            Column::Sector => "sector",
            Column::StartDate => "start_date",
            Column::EndDate => "end_date",
            Column::Year => "year",
            Column::MonthPeriod => "month_period",
            Column::MonthName => "month_name",
        }
    }

    /// Parse a canonical key (as produced by [`Column::key`]).
    pub fn from_key(key: &str) -> Option<Self> {
        let normalised = key.trim().to_lowercase().replace(['-', ' '], "_");
        match normalised.as_str() {
            "name" => Some(Column::Name),
            "status" => Some(Column::Status),
            "priority" => Some(Column::Priority),
            "assignee" => Some(Column::Assignee),
            "sector" => Some(Column::Sector),
            "start_date" => Some(Column::StartDate),
            "end_date" => Some(Column::EndDate),
            "year" => Some(Column::Year),
            "month_period" => Some(Column::MonthPeriod),
            "month_name" => Some(Column::MonthName),
            _ => None,
        }
    }

    /// Sentinel substituted for an absent value, for categorical columns.
    pub fn sentinel(self) -> Option<&'static str> {
        match self {
            Column::Name => Some(UNNAMED),
            Column::Status | Column::Priority | Column::Assignee | Column::Sector => {
                Some(NOT_DEFINED)
            }
            _ => None,
        }
    }

    /// Source column a derived column is computed from.
    pub fn source_column(self) -> Column {
        match self {
            Column::Year | Column::MonthPeriod | Column::MonthName => Column::EndDate,
            other => other,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ── MonthPeriod ───────────────────────────────────────────────────────────────

/// A (year, month) pair. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"YYYY-MM"` label.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ── RawRecord ─────────────────────────────────────────────────────────────────

/// One row exactly as read from a source, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub name: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub sector: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RawRecord {
    /// Store `value` under `column`. Derived columns are ignored.
    pub fn set(&mut self, column: Column, value: Option<String>) {
        match column {
            Column::Name => self.name = value,
            Column::Status => self.status = value,
            Column::Priority => self.priority = value,
            Column::Assignee => self.assignee = value,
            Column::Sector => self.sector = value,
            Column::StartDate => self.start_date = value,
            Column::EndDate => self.end_date = value,
            Column::Year | Column::MonthPeriod | Column::MonthName => {}
        }
    }
}

/// Rows read from a source together with the canonical columns it provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: BTreeSet<Column>,
    pub rows: Vec<RawRecord>,
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A normalized project/task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub sector: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Year of `end_date`.
    pub end_year: Option<i32>,
    /// `end_date` truncated to its month.
    pub end_period: Option<MonthPeriod>,
    /// Localized month name of `end_date`.
    pub end_month_name: Option<String>,
}

impl Record {
    /// Text value of a categorical column, `None` for date/derived columns.
    pub fn text(&self, column: Column) -> Option<&str> {
        match column {
            Column::Name => Some(&self.name),
            Column::Status => Some(&self.status),
            Column::Priority => Some(&self.priority),
            Column::Assignee => Some(&self.assignee),
            Column::Sector => Some(&self.sector),
            Column::MonthName => self.end_month_name.as_deref(),
            _ => None,
        }
    }

    /// `false` when the assignee is the [`NOT_DEFINED`] placeholder.
    pub fn has_assignee(&self) -> bool {
        self.assignee != NOT_DEFINED
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// An ordered collection of [`Record`]s sharing one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Source columns that were resolved at load time.
    columns: BTreeSet<Column>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: BTreeSet<Column>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// An empty table that keeps `self`'s schema.
    pub fn with_rows(&self, rows: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    /// Whether `column` (or the source column it is derived from) was present.
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column.source_column())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── SourceLocator ─────────────────────────────────────────────────────────────

/// Where a [`Table`] is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceLocator {
    Csv { path: PathBuf },
    Notion { database_id: String },
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Csv { path } => write!(f, "csv:{}", path.display()),
            SourceLocator::Notion { database_id } => write!(f, "notion:{}", database_id),
        }
    }
}
