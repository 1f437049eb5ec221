use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::models::Column;

/// Separator Notion uses in CSV exports for date ranges.
const RANGE_SEPARATOR: char = '→';

/// Date-only patterns, day-first before anything ambiguous.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y",
];

/// Date-time patterns; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
];

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a single date value, day-first.
///
/// Accepts `dd/mm/yyyy` (also `-` and `.` separators), ISO `yyyy-mm-dd`,
/// RFC 3339 timestamps and Notion's `January 15, 2024` export form, each with
/// an optional time of day. Returns `None` for blank or unrecognised input.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Like [`parse_date`] but reports unparseable input as a
/// [`DashboardError::ParseFailure`] attributed to `column`.
pub fn parse_date_strict(column: Column, value: &str) -> Result<NaiveDate> {
    parse_date(value).ok_or_else(|| DashboardError::ParseFailure {
        column,
        value: value.to_string(),
    })
}

/// Parse a value that may be a `start → end` range.
///
/// A plain date yields `(Some(date), None)`.
pub fn parse_date_range(value: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match value.split_once(RANGE_SEPARATOR) {
        Some((start, end)) => (parse_date(start), parse_date(end)),
        None => (parse_date(value), None),
    }
}

// ── Locale ────────────────────────────────────────────────────────────────────

/// Language used for month names and number formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR")]
    PtBr,
}

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_PT_BR: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

impl Locale {
    /// Month name for `month` in `1..=12`.
    pub fn month_name(self, month: u32) -> Option<&'static str> {
        let table = match self {
            Locale::En => &MONTHS_EN,
            Locale::PtBr => &MONTHS_PT_BR,
        };
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        table.get(index).copied()
    }

    /// `(thousands, decimal)` separators.
    pub fn separators(self) -> (char, char) {
        match self {
            Locale::En => (',', '.'),
            Locale::PtBr => ('.', ','),
        }
    }
}

impl FromStr for Locale {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            other => Err(DashboardError::Config(format!("unsupported locale: {}", other))),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::PtBr => f.write_str("pt-BR"),
        }
    }
}
