//! Loader + normalizer behind one interface per source kind.

use std::path::{Path, PathBuf};

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{SourceLocator, Table};
use tracing::debug;

use crate::aliases::AliasTable;
use crate::normalizer::Normalizer;
use crate::notion::{load_notion, NotionClient};
use crate::reader::load_csv;

/// Something that produces a normalized [`Table`] on demand.
///
/// `load` is blocking; async callers run it on the blocking pool.
pub trait TableSource: Send + Sync {
    fn locator(&self) -> SourceLocator;

    fn load(&self) -> Result<Table>;

    /// Cheap reachability check run once at startup.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

// ── CSV ───────────────────────────────────────────────────────────────────────

pub struct CsvSource {
    path: PathBuf,
    aliases: AliasTable,
    normalizer: Normalizer,
}

impl CsvSource {
    pub fn new(path: &Path, aliases: AliasTable, normalizer: Normalizer) -> Self {
        Self {
            path: path.to_path_buf(),
            aliases,
            normalizer,
        }
    }
}

impl TableSource for CsvSource {
    fn locator(&self) -> SourceLocator {
        SourceLocator::Csv {
            path: self.path.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(DashboardError::source_unavailable(
                self.locator(),
                "file not found",
            ))
        }
    }

    fn load(&self) -> Result<Table> {
        let raw = load_csv(&self.path, &self.aliases)?;
        Ok(self.normalizer.normalize_raw(raw))
    }
}

// ── Notion ────────────────────────────────────────────────────────────────────

pub struct NotionSource {
    client: NotionClient,
    aliases: AliasTable,
    normalizer: Normalizer,
}

impl NotionSource {
    pub fn new(client: NotionClient, aliases: AliasTable, normalizer: Normalizer) -> Self {
        Self {
            client,
            aliases,
            normalizer,
        }
    }

}

impl TableSource for NotionSource {
    fn locator(&self) -> SourceLocator {
        crate::notion::PageFetcher::locator(&self.client)
    }

    /// Check credentials and database access.
    fn validate(&self) -> Result<()> {
        self.client.validate()
    }

    fn load(&self) -> Result<Table> {
        let raw = load_notion(&self.client, &self.aliases)?;
        debug!("Loaded {} rows from {}", raw.rows.len(), self.locator());
        Ok(self.normalizer.normalize_raw(raw))
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Build the source for `locator`. Notion sources need `token`.
pub fn source_for(
    locator: &SourceLocator,
    token: Option<&str>,
    aliases: AliasTable,
    normalizer: Normalizer,
) -> Result<Box<dyn TableSource>> {
    match locator {
        SourceLocator::Csv { path } => Ok(Box::new(CsvSource::new(path, aliases, normalizer))),
        SourceLocator::Notion { database_id } => {
            let token = token.ok_or_else(|| {
                DashboardError::Config("a Notion token is required for a Notion source".into())
            })?;
            let client = NotionClient::new(token, database_id)?;
            Ok(Box::new(NotionSource::new(client, aliases, normalizer)))
        }
    }
}
