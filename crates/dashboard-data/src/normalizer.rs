//! Raw rows → normalized [`Record`]s.
//!
//! Categorical cells are trimmed and blank or textual-null values replaced by
//! the column's sentinel. Date cells are parsed day-first; a cell that does not
//! parse becomes absent and the row is kept. Year, month period and month name
//! are derived from the end date.

use chrono::{Datelike, NaiveDate};
use dashboard_core::dates::{parse_date_range, parse_date_strict, Locale};
use dashboard_core::models::{Column, MonthPeriod, RawRecord, RawTable, Record, Table};
use tracing::debug;

/// Cell contents treated as absent, compared case-insensitively.
const TEXTUAL_NULLS: [&str; 4] = ["null", "none", "nan", "nat"];

/// Turns loader output into a [`Table`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    locale: Locale,
}

impl Normalizer {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Normalize every row of `raw`, keeping its schema.
    pub fn normalize_raw(&self, raw: RawTable) -> Table {
        let rows: Vec<Record> = raw.rows.into_iter().map(|r| self.normalize_record(r)).collect();
        debug!("Normalized {} rows", rows.len());
        Table::new(raw.columns, rows)
    }

    /// Re-apply normalization to an existing table.
    ///
    /// A table produced by this normalizer comes back unchanged.
    pub fn normalize_table(&self, table: Table) -> Table {
        let columns = table.columns().clone();
        let rows = table
            .into_rows()
            .into_iter()
            .map(|record| {
                let start_date = record.start_date;
                let end_date = record.end_date;
                self.build(
                    [
                        Some(record.name),
                        Some(record.status),
                        Some(record.priority),
                        Some(record.assignee),
                        Some(record.sector),
                    ],
                    start_date,
                    end_date,
                )
            })
            .collect();
        Table::new(columns, rows)
    }

    /// Normalize a single raw row.
    pub fn normalize_record(&self, raw: RawRecord) -> Record {
        let start_date = raw
            .start_date
            .as_deref()
            .and_then(|v| parse_cell(Column::StartDate, v))
            .and_then(|(start, _)| start);

        // A range in the end column ("start → end") contributes its end, or its
        // start when the end is open.
        let end_date = raw
            .end_date
            .as_deref()
            .and_then(|v| parse_cell(Column::EndDate, v))
            .and_then(|(start, end)| end.or(start));

        self.build(
            [raw.name, raw.status, raw.priority, raw.assignee, raw.sector],
            start_date,
            end_date,
        )
    }

    fn build(
        &self,
        categorical: [Option<String>; 5],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Record {
        let [name, status, priority, assignee, sector] = categorical;

        Record {
            name: fill(Column::Name, name),
            status: fill(Column::Status, status),
            priority: fill(Column::Priority, priority),
            assignee: fill(Column::Assignee, assignee),
            sector: fill(Column::Sector, sector),
            start_date,
            end_date,
            end_year: end_date.map(|d| d.year()),
            end_period: end_date.map(MonthPeriod::from_date),
            end_month_name: end_date
                .and_then(|d| self.locale.month_name(d.month()))
                .map(str::to_string),
        }
    }
}

/// Trimmed cell content, or `None` for blank and textual-null cells.
pub fn clean_cell(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || TEXTUAL_NULLS.iter().any(|n| trimmed.eq_ignore_ascii_case(n)) {
        None
    } else {
        Some(trimmed)
    }
}

fn fill(column: Column, value: Option<String>) -> String {
    match value.as_deref().and_then(clean_cell) {
        Some(v) => v.to_string(),
        None => column.sentinel().unwrap_or_default().to_string(),
    }
}

/// Parse a date cell, absorbing failures.
fn parse_cell(column: Column, value: &str) -> Option<(Option<NaiveDate>, Option<NaiveDate>)> {
    let value = clean_cell(value)?;
    let (start, end) = parse_date_range(value);
    if start.is_none() && end.is_none() {
        if let Err(e) = parse_date_strict(column, value) {
            debug!("{}; treating as absent", e);
        }
        return None;
    }
    Some((start, end))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::models::{NOT_DEFINED, UNNAMED};
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(name: &str, status: &str, end: &str) -> RawRecord {
        RawRecord {
            name: Some(name.to_string()),
            status: Some(status.to_string()),
            end_date: Some(end.to_string()),
            ..Default::default()
        }
    }

    fn raw_table(rows: Vec<RawRecord>) -> RawTable {
        RawTable {
            columns: [Column::Name, Column::Status, Column::EndDate].into_iter().collect(),
            rows,
        }
    }

    // ── categorical ───────────────────────────────────────────────────────

    #[test]
    fn test_blank_status_becomes_sentinel() {
        let table = Normalizer::default().normalize_raw(raw_table(vec![
            raw("A", "Done", ""),
            raw("B", "", ""),
            raw("C", "Done", ""),
        ]));
        let statuses: Vec<&str> = table.rows().iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["Done", NOT_DEFINED, "Done"]);
    }

    #[test]
    fn test_textual_nulls_and_whitespace_are_absent() {
        let normalizer = Normalizer::default();
        for value in ["null", "None", "NaN", "NaT", "   "] {
            let record = normalizer.normalize_record(raw("A", value, ""));
            assert_eq!(record.status, NOT_DEFINED, "value {value:?}");
        }
        let record = normalizer.normalize_record(raw("  Portal  ", " Open ", ""));
        assert_eq!(record.name, "Portal");
        assert_eq!(record.status, "Open");
    }

    #[test]
    fn test_missing_fields_get_sentinels() {
        let record = Normalizer::default().normalize_record(RawRecord::default());
        assert_eq!(record.name, UNNAMED);
        assert_eq!(record.priority, NOT_DEFINED);
        assert_eq!(record.assignee, NOT_DEFINED);
        assert_eq!(record.sector, NOT_DEFINED);
        assert!(!record.has_assignee());
    }

    #[test]
    fn test_no_categorical_field_is_empty() {
        let table = Normalizer::default().normalize_raw(raw_table(vec![
            RawRecord::default(),
            raw("", "nan", "garbage"),
            raw("X", "Done", "01/02/2024"),
        ]));
        for record in table.rows() {
            for column in Column::CATEGORICAL {
                let value = record.text(column).unwrap();
                assert!(!value.trim().is_empty());
            }
        }
    }

    // ── dates ─────────────────────────────────────────────────────────────

    #[test]
    fn test_dates_are_day_first() {
        let record = Normalizer::default().normalize_record(RawRecord {
            start_date: Some("02/03/2024".to_string()),
            end_date: Some("15-04-2024 10:30".to_string()),
            ..Default::default()
        });
        assert_eq!(record.start_date, Some(date(2024, 3, 2)));
        assert_eq!(record.end_date, Some(date(2024, 4, 15)));
    }

    #[test]
    fn test_unparseable_date_is_absent_and_row_kept() {
        let table = Normalizer::default().normalize_raw(raw_table(vec![raw("A", "Done", "soon")]));
        assert_eq!(table.len(), 1);
        let record = &table.rows()[0];
        assert_eq!(record.end_date, None);
        assert_eq!(record.end_year, None);
        assert_eq!(record.end_period, None);
        assert_eq!(record.end_month_name, None);
    }

    #[test]
    fn test_end_column_range_uses_end_then_start() {
        let normalizer = Normalizer::default();
        let closed = normalizer.normalize_record(raw("A", "", "January 1, 2024 → January 31, 2024"));
        assert_eq!(closed.end_date, Some(date(2024, 1, 31)));

        let open = normalizer.normalize_record(raw("A", "", "January 5, 2024 → "));
        assert_eq!(open.end_date, Some(date(2024, 1, 5)));
    }

    #[test]
    fn test_start_column_range_uses_start() {
        let record = Normalizer::default().normalize_record(RawRecord {
            start_date: Some("2024-01-01 → 2024-02-01".to_string()),
            ..Default::default()
        });
        assert_eq!(record.start_date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_derived_fields_follow_locale() {
        let en = Normalizer::new(Locale::En).normalize_record(raw("A", "", "2024-03-10"));
        let pt = Normalizer::new(Locale::PtBr).normalize_record(raw("A", "", "2024-03-10"));

        assert_eq!(en.end_year, Some(2024));
        assert_eq!(en.end_period, Some(MonthPeriod { year: 2024, month: 3 }));
        assert_eq!(en.end_month_name.as_deref(), Some("March"));
        assert_eq!(pt.end_month_name.as_deref(), Some("Março"));
    }

    // ── idempotence ───────────────────────────────────────────────────────

    #[test]
    fn test_normalize_table_is_idempotent() {
        let normalizer = Normalizer::new(Locale::PtBr);
        let once = normalizer.normalize_raw(raw_table(vec![
            raw(" A ", "Done", "15/01/2024"),
            raw("", "null", ""),
            RawRecord::default(),
        ]));
        let twice = normalizer.normalize_table(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_table_keeps_schema() {
        let columns: BTreeSet<Column> = [Column::Name].into_iter().collect();
        let table = Normalizer::default().normalize_raw(RawTable {
            columns: columns.clone(),
            rows: vec![RawRecord::default()],
        });
        assert_eq!(table.columns(), &columns);
    }

    // ── clean_cell ────────────────────────────────────────────────────────

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell("  x "), Some("x"));
        assert_eq!(clean_cell(""), None);
        assert_eq!(clean_cell("NULL"), None);
        assert_eq!(clean_cell("nano"), Some("nano"));
    }
}
