//! CSV loading.
//!
//! Reads a project/task export (hand-made spreadsheet or Notion CSV export)
//! into [`RawRecord`]s, resolving headers through the [`AliasTable`].

use std::io::Read;
use std::path::Path;

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{Column, RawRecord, RawTable, SourceLocator};
use tracing::debug;

use crate::aliases::AliasTable;

const UTF8_BOM: &str = "\u{feff}";

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a CSV file.
///
/// A missing or unreadable file is [`DashboardError::SourceUnavailable`]; a
/// file without a resolvable name column is [`DashboardError::SchemaMismatch`].
pub fn load_csv(path: &Path, aliases: &AliasTable) -> Result<RawTable> {
    let locator = SourceLocator::Csv {
        path: path.to_path_buf(),
    };

    let mut bytes = Vec::new();
    std::fs::File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(|e| DashboardError::source_unavailable(&locator, e))?;

    let table = read_csv(&bytes, aliases)?;

    debug!(
        "Loaded {} rows from {} ({} columns resolved)",
        table.rows.len(),
        path.display(),
        table.columns.len()
    );

    Ok(table)
}

/// Parse CSV bytes into a [`RawTable`].
///
/// The delimiter (`,` or `;`) is detected from the header line. Cells are
/// decoded as UTF-8 with invalid sequences replaced, so Latin-1 exports still
/// load. Short rows are tolerated; missing cells read as absent.
pub fn read_csv(bytes: &[u8], aliases: &AliasTable) -> Result<RawTable> {
    let delimiter = detect_delimiter(bytes);
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = csv_reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let header = String::from_utf8_lossy(h).into_owned();
            if i == 0 {
                header.trim_start_matches(UTF8_BOM).to_string()
            } else {
                header
            }
        })
        .collect();

    let mapping = aliases.resolve_all(&headers);
    mapping.require(Column::Name)?;

    let mut rows = Vec::new();
    for record in csv_reader.byte_records() {
        let record = record?;
        let mut raw = RawRecord::default();
        for column in Column::SOURCE {
            let value = mapping
                .index(column)
                .and_then(|i| record.get(i))
                .map(|cell| String::from_utf8_lossy(cell).into_owned());
            raw.set(column, value);
        }
        rows.push(raw);
    }

    Ok(RawTable {
        columns: mapping.columns(),
        rows,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Pick `;` when the header line has more semicolons than commas.
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let header_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    let commas = header_line.iter().filter(|&&b| b == b',').count();
    let semicolons = header_line.iter().filter(|&&b| b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
