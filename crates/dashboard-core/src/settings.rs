use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dates::{parse_date, Locale};
use crate::error::{DashboardError, Result};
use crate::models::SourceLocator;

/// View modes the binary can serve.
pub const VIEWS: [&str; 3] = ["report", "table", "watch"];

/// Default minutes between background refreshes in watch mode.
pub const DEFAULT_REFRESH_MINUTES: u32 = 30;
pub const MIN_REFRESH_MINUTES: u32 = 1;
pub const MAX_REFRESH_MINUTES: u32 = 1440;

/// Default seconds a loaded table is served before it is reloaded.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Project dashboard over a CSV file or a Notion database
#[derive(Parser, Debug, Clone)]
#[command(
    name = "project-dashboard",
    about = "Project dashboard over a CSV file or a Notion database",
    version
)]
pub struct Settings {
    /// CSV file to load
    #[arg(long, env = "DASHBOARD_CSV")]
    pub csv: Option<PathBuf>,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub notion_token: Option<String>,

    /// Notion database id or URL
    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub notion_database: Option<String>,

    /// JSON file with extra column aliases, e.g. {"priority": ["Prio"]}
    #[arg(long)]
    pub aliases: Option<PathBuf>,

    /// View mode
    #[arg(long, default_value = "report", value_parser = VIEWS)]
    pub view: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Locale for month names and numbers
    #[arg(long, default_value = "en", value_parser = ["en", "pt-BR"])]
    pub locale: String,

    /// Minutes between background refreshes in watch mode (1-1440)
    #[arg(
        long,
        default_value_t = DEFAULT_REFRESH_MINUTES,
        value_parser = clap::value_parser!(u32)
            .range(i64::from(MIN_REFRESH_MINUTES)..=i64::from(MAX_REFRESH_MINUTES))
    )]
    pub refresh_minutes: u32,

    /// Seconds a loaded table is served before it is reloaded
    #[arg(
        long,
        default_value_t = DEFAULT_CACHE_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cache_ttl_secs: u64,

    /// Keep only these statuses (repeatable)
    #[arg(long = "status")]
    pub status: Vec<String>,

    /// Keep only these priorities (repeatable)
    #[arg(long = "priority")]
    pub priority: Vec<String>,

    /// Keep only these sectors (repeatable)
    #[arg(long = "sector")]
    pub sector: Vec<String>,

    /// Keep only these project names (repeatable)
    #[arg(long = "project")]
    pub project: Vec<String>,

    /// Case-insensitive search in the assignee column
    #[arg(long)]
    pub search: Option<String>,

    /// Earliest end date (inclusive, day-first)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Latest end date (inclusive, day-first)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Drop rows without an end date
    #[arg(long)]
    pub exclude_undated: bool,

    /// Status values that count as completed (repeatable)
    #[arg(long = "completed-status", default_values = ["Done", "Concluído"])]
    pub completed_status: Vec<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

fn parse_date_arg(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date \"{}\" (expected dd/mm/yyyy)", value))
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.project-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_minutes: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".project-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments (with environment fallbacks), merge with last-used
    /// params where no explicit CLI value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] but with explicit arguments
    /// and config path so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Saved values bypass clap's parsers, so they are
        // checked here and ignored when out of range.
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                if VIEWS.contains(&v.as_str()) {
                    settings.view = v;
                } else {
                    tracing::warn!(view = %v, "ignoring saved view");
                }
            }
        }
        if !is_arg_explicitly_set(&matches, "locale") {
            if let Some(v) = last.locale {
                if v.parse::<Locale>().is_ok() {
                    settings.locale = v;
                } else {
                    tracing::warn!(locale = %v, "ignoring saved locale");
                }
            }
        }
        // NOTE: clap stores the arg id using the field name (underscores).
        if !is_arg_explicitly_set(&matches, "refresh_minutes") {
            if let Some(v) = last.refresh_minutes {
                if (MIN_REFRESH_MINUTES..=MAX_REFRESH_MINUTES).contains(&v) {
                    settings.refresh_minutes = v;
                } else {
                    tracing::warn!(refresh_minutes = v, "ignoring saved refresh interval");
                }
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used parameters");
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Resolved locale; unknown persisted values fall back to English.
    pub fn locale(&self) -> Locale {
        self.locale.parse().unwrap_or_default()
    }

    /// The configured source, if any.
    ///
    /// An explicit CSV path takes precedence over Notion credentials. A Notion
    /// database id that does not contain 32 hex digits, or a database without a
    /// token, is a configuration error.
    pub fn source_locator(&self) -> Result<Option<SourceLocator>> {
        if let Some(path) = &self.csv {
            return Ok(Some(SourceLocator::Csv { path: path.clone() }));
        }

        let Some(raw_id) = self.notion_database.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        let database_id = sanitize_database_id(raw_id).ok_or_else(|| {
            DashboardError::Config(format!(
                "NOTION_DATABASE_ID must contain a 32-hex-digit database id, got \"{}\"",
                raw_id
            ))
        })?;

        if self.notion_token().is_none() {
            return Err(DashboardError::Config(
                "NOTION_TOKEN is required for a Notion database".to_string(),
            ));
        }

        Ok(Some(SourceLocator::Notion { database_id }))
    }

    /// The Notion token, trimmed; `None` when blank.
    pub fn notion_token(&self) -> Option<&str> {
        self.notion_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Extract a 32-hex-digit Notion database id from a raw id or URL.
///
/// Hyphens are removed first, so both dashed UUIDs and share links work.
pub fn sanitize_database_id(raw: &str) -> Option<String> {
    let compact = raw.replace('-', "");
    let re = Regex::new(r"[0-9a-fA-F]{32}").ok()?;
    re.find(&compact).map(|m| m.as_str().to_string())
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            locale: Some(s.locale.clone()),
            refresh_minutes: Some(s.refresh_minutes),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn parse(args: &[&str]) -> Settings {
        let mut full = vec!["project-dashboard"];
        full.extend_from_slice(args);
        Settings::parse_from(full)
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            view: Some("table".to_string()),
            locale: Some("pt-BR".to_string()),
            refresh_minutes: Some(15),
        };

        params.save_to(&path).expect("save");
        let loaded = LastUsedParams::load_from(&path);

        assert_eq!(loaded.view, Some("table".to_string()));
        assert_eq!(loaded.locale, Some("pt-BR".to_string()));
        assert_eq!(loaded.refresh_minutes, Some(15));
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);

        LastUsedParams {
            view: Some("watch".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.view.is_none());
        assert!(loaded.locale.is_none());
        assert!(loaded.refresh_minutes.is_none());
    }

    // ── Settings defaults / parsing ───────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = parse(&[]);

        assert_eq!(settings.view, "report");
        assert_eq!(settings.format, "text");
        assert_eq!(settings.locale, "en");
        assert_eq!(settings.refresh_minutes, 30);
        assert_eq!(settings.cache_ttl_secs, 300);
        assert!(settings.status.is_empty());
        assert!(settings.search.is_none());
        assert!(settings.from.is_none());
        assert!(!settings.exclude_undated);
        assert_eq!(settings.completed_status, vec!["Done", "Concluído"]);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_repeatable_filters() {
        let settings = parse(&["--status", "Done", "--status", "Blocked", "--sector", "TI"]);
        assert_eq!(settings.status, vec!["Done", "Blocked"]);
        assert_eq!(settings.sector, vec!["TI"]);
    }

    #[test]
    fn test_settings_dates_are_day_first() {
        let settings = parse(&["--from", "01/02/2024", "--to", "2024-03-31"]);
        assert_eq!(settings.from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(settings.to, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn test_settings_rejects_bad_date() {
        let result = Settings::try_parse_from(["project-dashboard", "--from", "someday"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_rejects_refresh_out_of_range() {
        let result = Settings::try_parse_from(["project-dashboard", "--refresh-minutes", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_locale() {
        assert_eq!(parse(&["--locale", "pt-BR"]).locale(), Locale::PtBr);
        assert_eq!(parse(&[]).locale(), Locale::En);
    }

    // ── source_locator ────────────────────────────────────────────────────────

    #[test]
    fn test_source_locator_prefers_csv() {
        let settings = parse(&["--csv", "Projetos.csv", "--notion-database", "x"]);
        assert_eq!(
            settings.source_locator().unwrap(),
            Some(SourceLocator::Csv {
                path: PathBuf::from("Projetos.csv")
            })
        );
    }

    #[test]
    fn test_source_locator_notion_sanitizes_id() {
        let settings = parse(&[
            "--notion-token",
            "secret_abc",
            "--notion-database",
            "https://www.notion.so/ws/0123456789abcdef0123456789abcdef?v=1",
        ]);
        assert_eq!(
            settings.source_locator().unwrap(),
            Some(SourceLocator::Notion {
                database_id: "0123456789abcdef0123456789abcdef".to_string()
            })
        );
    }

    #[test]
    fn test_source_locator_rejects_bad_id() {
        let settings = parse(&["--notion-token", "t", "--notion-database", "not-an-id"]);
        assert!(matches!(
            settings.source_locator(),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn test_source_locator_requires_token_for_notion() {
        let mut settings = parse(&["--notion-database", "0123456789abcdef0123456789abcdef"]);
        settings.notion_token = Some("   ".to_string());
        assert!(settings.source_locator().is_err());
    }

    // ── sanitize_database_id ──────────────────────────────────────────────────

    #[test]
    fn test_sanitize_database_id() {
        assert_eq!(
            sanitize_database_id("01234567-89ab-cdef-0123-456789abcdef").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(sanitize_database_id(""), None);
        assert_eq!(sanitize_database_id("abc123"), None);
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_view() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        LastUsedParams {
            view: Some("table".to_string()),
            locale: Some("pt-BR".to_string()),
            refresh_minutes: Some(5),
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["project-dashboard".into()], &config_path);
        assert_eq!(settings.view, "table");
        assert_eq!(settings.locale, "pt-BR");
        assert_eq!(settings.refresh_minutes, 5);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        LastUsedParams {
            view: Some("table".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["project-dashboard".into(), "--view".into(), "watch".into()],
            &config_path,
        );
        assert_eq!(settings.view, "watch");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        LastUsedParams {
            view: Some("table".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["project-dashboard".into(), "--clear".into()],
            &config_path,
        );

        assert!(!config_path.exists());
        assert_eq!(settings.view, "report");
    }

    #[test]
    fn test_load_with_last_used_ignores_out_of_range_refresh() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, r#"{"refresh_minutes": 0}"#).unwrap();

        let settings =
            Settings::load_with_last_used_impl(vec!["project-dashboard".into()], &config_path);
        assert_eq!(settings.refresh_minutes, DEFAULT_REFRESH_MINUTES);

        std::fs::write(&config_path, r#"{"refresh_minutes": 5000}"#).unwrap();
        let settings =
            Settings::load_with_last_used_impl(vec!["project-dashboard".into()], &config_path);
        assert_eq!(settings.refresh_minutes, DEFAULT_REFRESH_MINUTES);

        // The repaired value is what gets persisted.
        assert_eq!(
            LastUsedParams::load_from(&config_path).refresh_minutes,
            Some(DEFAULT_REFRESH_MINUTES)
        );
    }

    #[test]
    fn test_load_with_last_used_ignores_unknown_view_and_locale() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        LastUsedParams {
            view: Some("dashboard".to_string()),
            locale: Some("fr".to_string()),
            refresh_minutes: Some(1440),
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["project-dashboard".into()], &config_path);
        assert_eq!(settings.view, "report");
        assert_eq!(settings.locale, "en");
        assert_eq!(settings.refresh_minutes, 1440);
    }

    #[test]
    fn test_settings_rejects_zero_cache_ttl() {
        let result = Settings::try_parse_from(["project-dashboard", "--cache-ttl-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            vec!["project-dashboard".into(), "--debug".into()],
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            vec!["project-dashboard".into(), "--locale".into(), "pt-BR".into()],
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.locale, Some("pt-BR".to_string()));
        assert_eq!(loaded.view, Some("report".to_string()));
    }
}
