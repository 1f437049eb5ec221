//! Everything the rendering layer needs for one filter state.

use dashboard_core::error::Result;
use dashboard_core::models::{Column, Table};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{AggregateRow, Aggregator, MonthlyCount, Summary, TimelineEntry};
use crate::filter::{date_bounds, DateBounds, FilterOptions, FilterSpec};

/// Knobs for [`build_report`] that are not part of the filter.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Status values counted as completed in the summary.
    pub completed_statuses: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            completed_statuses: vec!["Done".to_string(), "Concluído".to_string()],
        }
    }
}

/// Filtered table plus every chart series and headline figure.
///
/// A series is `None` when the column it needs is missing from the source;
/// `notices` then says which output was left out.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub filter: FilterSpec,
    /// Values offered by each set filter, taken from the unfiltered table.
    pub options: FilterOptions,
    /// End-date range of the unfiltered table.
    pub bounds: DateBounds,
    pub summary: Summary,
    pub by_priority: Option<Vec<AggregateRow>>,
    pub by_status: Option<Vec<AggregateRow>>,
    pub by_year: Option<Vec<AggregateRow>>,
    pub by_sector: Option<Vec<AggregateRow>>,
    pub sector_status: Option<Vec<AggregateRow>>,
    pub monthly: Option<Vec<MonthlyCount>>,
    pub timeline: Option<Vec<TimelineEntry>>,
    pub table: Table,
    pub notices: Vec<String>,
}

/// Filter `table` and aggregate the result.
pub fn build_report(table: &Table, filter: &FilterSpec, options: &ReportOptions) -> DashboardReport {
    let filtered = filter.apply(table);
    let mut notices = Vec::new();

    let by_priority = omit_missing(
        Aggregator::count_by(&filtered, Column::Priority),
        "priority chart",
        &mut notices,
    );
    let by_status = omit_missing(
        Aggregator::count_by(&filtered, Column::Status),
        "status chart",
        &mut notices,
    );
    let by_year = omit_missing(
        Aggregator::count_by(&filtered, Column::Year),
        "per-year counts",
        &mut notices,
    );
    let by_sector = omit_missing(
        Aggregator::count_by(&filtered, Column::Sector),
        "sector chart",
        &mut notices,
    );
    let sector_status = omit_missing(
        Aggregator::count_by_pair(&filtered, Column::Sector, Column::Status),
        "sector by status chart",
        &mut notices,
    );
    let monthly = omit_missing(
        Aggregator::monthly_counts(&filtered),
        "monthly chart",
        &mut notices,
    );

    let timeline = if filtered.has_column(Column::StartDate) && filtered.has_column(Column::EndDate)
    {
        Some(Aggregator::timeline(&filtered))
    } else {
        notices.push("timeline omitted: start and end date columns are both required".to_string());
        None
    };

    debug!(
        "Report built: {} of {} rows, {} notices",
        filtered.len(),
        table.len(),
        notices.len()
    );

    DashboardReport {
        filter: filter.clone(),
        options: FilterOptions::from_table(table),
        bounds: date_bounds(table),
        summary: Aggregator::summary(&filtered, &options.completed_statuses),
        by_priority,
        by_status,
        by_year,
        by_sector,
        sector_status,
        monthly,
        timeline,
        table: filtered,
        notices,
    }
}

/// Turn an aggregation error into a notice.
fn omit_missing<T>(result: Result<T>, what: &str, notices: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            notices.push(format!("{} omitted: {}", what, e));
            None
        }
    }
}
