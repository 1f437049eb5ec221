//! Shared table cache with atomic-swap refresh.
//!
//! The current table lives behind an `Arc`. A refresh loads the replacement
//! without holding any lock and swaps it in under a short write lock, so a
//! reader sees either the old table or the new one, never a mix. A failed
//! refresh keeps the previous table and records the failure.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{SourceLocator, Table};
use dashboard_data::source::TableSource;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Maximum number of load attempts per refresh.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── CachedTable ───────────────────────────────────────────────────────────────

/// A loaded table and when it was loaded.
#[derive(Debug)]
pub struct CachedTable {
    pub table: Table,
    pub locator: SourceLocator,
    /// Wall-clock time of the refresh, for display.
    pub refreshed_at: DateTime<Local>,
    loaded_at: Instant,
}

impl CachedTable {
    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

#[derive(Default)]
struct CacheState {
    current: Option<Arc<CachedTable>>,
    last_error: Option<String>,
}

// ── TableCache ────────────────────────────────────────────────────────────────

/// Owns a [`TableSource`] and the most recent table loaded from it.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use dashboard_data::aliases::AliasTable;
/// use dashboard_data::normalizer::Normalizer;
/// use dashboard_data::source::CsvSource;
/// use dashboard_runtime::cache::TableCache;
///
/// let source = CsvSource::new(Path::new("Projetos.csv"), AliasTable::default(), Normalizer::default());
/// let cache = TableCache::new(Box::new(source), 300);
/// if let Ok(cached) = cache.get_fresh() {
///     println!("{} rows", cached.table.len());
/// }
/// ```
pub struct TableCache {
    source: Box<dyn TableSource>,
    ttl: Duration,
    state: RwLock<CacheState>,
    /// Serializes refreshes; readers never take it.
    refresh_lock: Mutex<()>,
}

impl TableCache {
    pub fn new(source: Box<dyn TableSource>, cache_ttl_secs: u64) -> Self {
        Self {
            source,
            ttl: Duration::from_secs(cache_ttl_secs),
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    pub fn locator(&self) -> SourceLocator {
        self.source.locator()
    }

    /// The current table, if one has been loaded.
    pub fn get(&self) -> Option<Arc<CachedTable>> {
        self.read_state().current.clone()
    }

    /// Load a new table and swap it in.
    ///
    /// On failure the previous table stays current and the error is kept as
    /// [`TableCache::last_error`].
    pub fn refresh(&self) -> Result<Arc<CachedTable>> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.load_with_retry() {
            Ok(table) => {
                let cached = Arc::new(CachedTable {
                    table,
                    locator: self.source.locator(),
                    refreshed_at: Local::now(),
                    loaded_at: Instant::now(),
                });
                tracing::debug!(rows = cached.table.len(), locator = %cached.locator, "table cache updated");

                let mut state = self.write_state();
                state.current = Some(Arc::clone(&cached));
                state.last_error = None;
                Ok(cached)
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed; keeping previous table");
                self.write_state().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The current table if it is younger than the TTL, otherwise a fresh one.
    ///
    /// When the reload fails but an older table exists, the older table is
    /// returned; the error is only surfaced when nothing was ever loaded.
    pub fn get_fresh(&self) -> Result<Arc<CachedTable>> {
        if let Some(cached) = self.get().filter(|c| c.age() < self.ttl) {
            tracing::debug!("returning cached table");
            return Ok(cached);
        }

        match self.refresh() {
            Ok(cached) => Ok(cached),
            Err(e) => self.get().ok_or(e),
        }
    }

    /// Drop the current table so the next [`TableCache::get_fresh`] reloads.
    pub fn invalidate(&self) {
        self.write_state().current = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current table, or `None` if nothing is loaded.
    pub fn cache_age(&self) -> Option<Duration> {
        self.get().map(|c| c.age())
    }

    /// Message from the last failed refresh, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.clone()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Up to [`MAX_RETRY_ATTEMPTS`] loads with linear back-off (0, 100, 200 ms).
    ///
    /// Only source-level failures are retried.
    fn load_with_retry(&self) -> Result<Table> {
        let mut last_err: Option<DashboardError> = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep_ms = (attempt as u64) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying load after back-off");
                thread::sleep(Duration::from_millis(sleep_ms));
            }

            match self.source.load() {
                Ok(table) => return Ok(table),
                Err(e) if e.is_source_level() => {
                    tracing::warn!(attempt, error = %e, "load attempt failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            DashboardError::source_unavailable(self.source.locator(), "no load attempted")
        }))
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
