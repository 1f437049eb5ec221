//! Column alias table and header resolution.
//!
//! Sources name their columns inconsistently ("Priority" vs "Prioridade",
//! "Owner" vs "Atualizado por"). Resolution runs once per load and yields a
//! fixed mapping from canonical [`Column`] to source header.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::Column;

/// Ordered alias lists per canonical source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<Column, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let defaults: [(Column, &[&str]); 7] = [
            (
                Column::Name,
                &["Projeto", "Project", "Nome", "Name", "Title", "Tarefa", "Task"],
            ),
            (Column::Status, &["Status", "Situação"]),
            (Column::Priority, &["Prioridade", "Priority"]),
            (
                Column::Assignee,
                &["Atualizado por", "Responsável", "Owner", "Assignee"],
            ),
            (Column::Sector, &["Setor", "Área", "Sector", "Area"]),
            (
                Column::StartDate,
                &["Data de Início", "Inicio", "Start", "Start Date"],
            ),
            (
                Column::EndDate,
                &["Data de Término", "Termino", "Fim", "End", "End Date"],
            ),
        ];

        let entries = defaults
            .into_iter()
            .map(|(column, aliases)| (column, aliases.iter().map(|a| a.to_string()).collect()))
            .collect();

        Self { entries }
    }
}

impl AliasTable {
    /// Aliases for `column`, in priority order.
    pub fn aliases(&self, column: Column) -> &[String] {
        self.entries.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Put `extra` aliases ahead of the existing ones for `column`.
    pub fn prepend(&mut self, column: Column, extra: Vec<String>) {
        let existing = self.entries.remove(&column).unwrap_or_default();
        let mut merged = extra;
        for alias in existing {
            if !merged.contains(&alias) {
                merged.push(alias);
            }
        }
        self.entries.insert(column, merged);
    }

    /// Default table extended with the aliases in a JSON file of the form
    /// `{"priority": ["Prio"], "end_date": ["Deadline"]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DashboardError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Default table extended with aliases from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut table = Self::default();

        for (key, aliases) in overrides {
            let column = Column::from_key(&key)
                .filter(|c| Column::SOURCE.contains(c))
                .ok_or_else(|| {
                    DashboardError::Config(format!("unknown column in alias file: {}", key))
                })?;
            table.prepend(column, aliases);
        }

        Ok(table)
    }

    /// Find the header for `column` among `headers`.
    ///
    /// An exact match on any alias wins over a case-insensitive one; within
    /// each pass, alias order decides.
    pub fn resolve<'h>(&self, column: Column, headers: &'h [String]) -> Option<&'h str> {
        let aliases = self.aliases(column);

        for alias in aliases {
            if let Some(h) = headers.iter().find(|h| h.trim() == alias) {
                return Some(h.as_str());
            }
        }

        for alias in aliases {
            let wanted = alias.to_lowercase();
            if let Some(h) = headers.iter().find(|h| h.trim().to_lowercase() == wanted) {
                return Some(h.as_str());
            }
        }

        None
    }

    /// Resolve every source column against `headers`.
    pub fn resolve_all(&self, headers: &[String]) -> ColumnMapping {
        let mut positions = BTreeMap::new();
        for column in Column::SOURCE {
            if let Some(header) = self.resolve(column, headers) {
                if let Some(index) = headers.iter().position(|h| h == header) {
                    positions.insert(column, (index, header.to_string()));
                }
            }
        }
        ColumnMapping {
            positions,
            headers: headers.to_vec(),
        }
    }
}

// ── ColumnMapping ─────────────────────────────────────────────────────────────

/// Result of resolving a header row: canonical column → (index, header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    positions: BTreeMap<Column, (usize, String)>,
    headers: Vec<String>,
}

impl ColumnMapping {
    pub fn index(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).map(|(i, _)| *i)
    }

    pub fn header(&self, column: Column) -> Option<&str> {
        self.positions.get(&column).map(|(_, h)| h.as_str())
    }

    /// Canonical columns that resolved.
    pub fn columns(&self) -> BTreeSet<Column> {
        self.positions.keys().copied().collect()
    }

    /// Fail with [`DashboardError::SchemaMismatch`] unless `column` resolved.
    pub fn require(&self, column: Column) -> Result<usize> {
        self.index(column)
            .ok_or_else(|| DashboardError::SchemaMismatch {
                column,
                available: self.headers.clone(),
            })
    }
}
