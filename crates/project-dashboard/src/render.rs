//! Plain-text rendering of reports and tables.

use std::fmt::Write;

use dashboard_core::dates::Locale;
use dashboard_core::formatting::{format_count, format_date, format_percent};
use dashboard_core::models::Table;
use dashboard_data::aggregator::AggregateRow;
use dashboard_data::report::DashboardReport;

/// Render every section of `report`.
pub fn render_report(report: &DashboardReport, locale: Locale) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(
        out,
        "Rows: {}   Projects: {}   Completed: {} ({})   Latest end: {}",
        format_count(s.total, locale),
        format_count(s.unique_names, locale),
        format_count(s.completed, locale),
        format_percent(s.completion_rate, locale),
        format_date(s.latest_end, locale),
    );

    section(&mut out, "By priority", report.by_priority.as_deref(), locale);
    section(&mut out, "By status", report.by_status.as_deref(), locale);
    section(&mut out, "By year", report.by_year.as_deref(), locale);
    section(&mut out, "By sector", report.by_sector.as_deref(), locale);
    section(&mut out, "Sector x status", report.sector_status.as_deref(), locale);

    if let Some(monthly) = &report.monthly {
        let _ = writeln!(out, "\nMonthly");
        for m in monthly {
            let _ = writeln!(out, "  {:<10} {:>6}", m.label, format_count(m.count, locale));
        }
    }

    if let Some(timeline) = &report.timeline {
        let _ = writeln!(out, "\nTimeline");
        let width = timeline.iter().map(|e| e.name.chars().count()).max().unwrap_or(0);
        for e in timeline {
            let _ = writeln!(
                out,
                "  {:<width$}  {} -> {}  {}",
                e.name,
                format_date(Some(e.start), locale),
                format_date(Some(e.end), locale),
                e.status,
                width = width
            );
        }
    }

    if !report.notices.is_empty() {
        let _ = writeln!(out, "\nNotices");
        for notice in &report.notices {
            let _ = writeln!(out, "  - {}", notice);
        }
    }

    out
}

fn section(out: &mut String, title: &str, rows: Option<&[AggregateRow]>, locale: Locale) {
    let Some(rows) = rows else {
        return;
    };
    let _ = writeln!(out, "\n{}", title);
    let labels: Vec<String> = rows.iter().map(|r| r.key.join(" / ")).collect();
    let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    for (label, row) in labels.iter().zip(rows) {
        let _ = writeln!(
            out,
            "  {:<width$} {:>6}",
            label,
            format_count(row.count, locale),
            width = width
        );
    }
}

/// Render the detail table, one row per record.
pub fn render_table(table: &Table, locale: Locale) -> String {
    let header = ["Name", "Status", "Priority", "Assignee", "Sector", "Start", "End"];
    let rows: Vec<[String; 7]> = table
        .rows()
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.status.clone(),
                r.priority.clone(),
                r.assignee.clone(),
                r.sector.clone(),
                format_date(r.start_date, locale),
                format_date(r.end_date, locale),
            ]
        })
        .collect();

    let mut widths: [usize; 7] = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{:<w$}", c, w = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(out, "{}", line(header.to_vec()));
    for row in &rows {
        let _ = writeln!(out, "{}", line(row.iter().map(String::as_str).collect()));
    }
    let _ = writeln!(out, "({} rows)", format_count(table.len(), locale));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::models::{Column, RawRecord, RawTable};
    use dashboard_data::filter::FilterSpec;
    use dashboard_data::normalizer::Normalizer;
    use dashboard_data::report::{build_report, ReportOptions};

    fn table(columns: &[Column]) -> Table {
        Normalizer::new(Locale::PtBr).normalize_raw(RawTable {
            columns: columns.iter().copied().collect(),
            rows: vec![RawRecord {
                name: Some("Portal".to_string()),
                status: Some("Concluído".to_string()),
                priority: Some("Alta".to_string()),
                start_date: Some("01/01/2024".to_string()),
                end_date: Some("15/01/2024".to_string()),
                ..Default::default()
            }],
        })
    }

    #[test]
    fn test_render_report_sections() {
        let report = build_report(
            &table(&Column::SOURCE),
            &FilterSpec::default(),
            &ReportOptions::default(),
        );
        let text = render_report(&report, Locale::PtBr);

        assert!(text.contains("Completed: 1 (100,0%)"));
        assert!(text.contains("Latest end: 15/01/2024"));
        assert!(text.contains("By priority\n  Alta"));
        assert!(text.contains("2024-01"));
        assert!(text.contains("Portal  01/01/2024 -> 15/01/2024  Concluído"));
        assert!(!text.contains("Notices"));
    }

    #[test]
    fn test_render_report_lists_notices() {
        let report = build_report(
            &table(&[Column::Name, Column::Status]),
            &FilterSpec::default(),
            &ReportOptions::default(),
        );
        let text = render_report(&report, Locale::En);
        assert!(text.contains("Notices\n  - priority chart omitted"));
        assert!(!text.contains("By priority"));
    }

    #[test]
    fn test_render_table() {
        let text = render_table(&table(&Column::SOURCE), Locale::En);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Name    Status"));
        assert!(lines[1].contains("2024-01-15"));
        assert_eq!(lines.last(), Some(&"(1 rows)"));
    }
}
