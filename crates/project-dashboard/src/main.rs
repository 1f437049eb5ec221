mod bootstrap;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dashboard_core::models::SourceLocator;
use dashboard_core::settings::Settings;
use dashboard_data::aliases::AliasTable;
use dashboard_data::filter::FilterSpec;
use dashboard_data::normalizer::Normalizer;
use dashboard_data::report::{build_report, DashboardReport, ReportOptions};
use dashboard_data::source::source_for;
use dashboard_runtime::cache::{CachedTable, TableCache};
use dashboard_runtime::scheduler::{RefreshNotice, RefreshScheduler};

// The Notion client is blocking and must not be dropped inside an async
// context, so only watch mode runs on a tokio runtime.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Project dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Format: {}, Locale: {}",
        settings.view,
        settings.format,
        settings.locale
    );

    let locator = match settings.source_locator()? {
        Some(locator) => locator,
        None => bootstrap::discover_csv()
            .map(|path| SourceLocator::Csv { path })
            .context(
                "no data source: pass --csv, or set NOTION_TOKEN and NOTION_DATABASE_ID",
            )?,
    };
    tracing::info!("Source: {}", locator);

    let aliases = match &settings.aliases {
        Some(path) => AliasTable::from_file(path)?,
        None => AliasTable::default(),
    };
    let normalizer = Normalizer::new(settings.locale());

    let source = source_for(&locator, settings.notion_token(), aliases, normalizer)?;
    source
        .validate()
        .with_context(|| format!("{} is not accessible", locator))?;
    let cache = Arc::new(TableCache::new(source, settings.cache_ttl_secs));

    // Fail fast when the source cannot be read at all.
    let initial = cache
        .get_fresh()
        .with_context(|| format!("could not load {}", locator))?;

    match settings.view.as_str() {
        "report" => print_report(&settings, &initial)?,
        "table" => print_table(&settings, &initial)?,
        "watch" => {
            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(watch(&settings, Arc::clone(&cache), initial));
            drop(runtime);
            result?;
        }
        unknown => bail!("unknown view mode: {}", unknown),
    }

    Ok(())
}

fn report_for(settings: &Settings, cached: &CachedTable) -> DashboardReport {
    let options = ReportOptions {
        completed_statuses: settings.completed_status.clone(),
    };
    build_report(&cached.table, &FilterSpec::from(settings), &options)
}

fn print_report(settings: &Settings, cached: &CachedTable) -> Result<()> {
    let report = report_for(settings, cached);
    if settings.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} (loaded {})",
            cached.locator,
            cached.refreshed_at.format("%Y-%m-%d %H:%M:%S")
        );
        print!("{}", render::render_report(&report, settings.locale()));
    }
    Ok(())
}

fn print_table(settings: &Settings, cached: &CachedTable) -> Result<()> {
    let filtered = FilterSpec::from(settings).apply(&cached.table);
    if settings.format == "json" {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
    } else {
        print!("{}", render::render_table(&filtered, settings.locale()));
    }
    Ok(())
}

/// Reprint the report whenever the table changes, until Ctrl+C.
///
/// The scheduler reloads every `refresh_minutes`; in between, the table is
/// re-read through the cache every `cache_ttl_secs` so a shorter TTL still
/// bounds how stale the printed report can get.
async fn watch(
    settings: &Settings,
    cache: Arc<TableCache>,
    initial: Arc<CachedTable>,
) -> Result<()> {
    let interval = Duration::from_secs(u64::from(settings.refresh_minutes) * 60);
    let ttl = Duration::from_secs(settings.cache_ttl_secs.max(1));
    tracing::info!(
        "Refreshing every {} minutes, cache TTL {}s",
        settings.refresh_minutes,
        ttl.as_secs()
    );

    let (mut rx, handle) = RefreshScheduler::new(interval, Arc::clone(&cache)).start();
    let mut ttl_tick = tokio::time::interval_at(tokio::time::Instant::now() + ttl, ttl);
    // The scheduler's first refresh runs immediately and triggers the first
    // print.
    let mut shown = initial;

    let result = loop {
        tokio::select! {
            notice = rx.recv() => {
                match notice {
                    Some(RefreshNotice::Refreshed { rows, at }) => {
                        tracing::info!(rows, "table refreshed at {}", at.format("%H:%M:%S"));
                    }
                    Some(RefreshNotice::Failed { reason, kept_previous }) => {
                        tracing::warn!(kept_previous, "refresh failed: {}", reason);
                        eprintln!("Refresh failed: {}", reason);
                        continue;
                    }
                    None => break Err(anyhow::anyhow!("background refresh stopped unexpectedly")),
                }
            }
            _ = ttl_tick.tick() => {
                let worker = Arc::clone(&cache);
                if let Err(e) = tokio::task::spawn_blocking(move || worker.get_fresh()).await? {
                    tracing::warn!(error = %e, "cache reload failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping refresh task");
                break Ok(());
            }
        }

        if let Some(current) = cache.get().filter(|c| !Arc::ptr_eq(c, &shown)) {
            shown = current;
            print_report(settings, &shown)?;
        }
    };

    handle.stop();
    result
}
