use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// CSV file names looked for when no source is configured.
const DEFAULT_CSV_NAMES: [&str; 2] = ["Projetos.csv", "projects.csv"];

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// `~/.project-dashboard/`.
pub fn app_dir() -> PathBuf {
    app_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

fn app_dir_in(home: &Path) -> PathBuf {
    home.join(".project-dashboard")
}

/// Ensure `~/.project-dashboard/` and its `logs/` subdirectory exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    ensure_directories_in(&app_dir())
}

fn ensure_directories_in(dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(dir.to_path_buf())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map `DEBUG`/`WARNING`/`CRITICAL` style level names onto an `EnvFilter` directive.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so report output on stdout stays machine-readable. With
/// `log_file`, a second plain-text layer appends to that file.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Source discovery ───────────────────────────────────────────────────────────

/// Look for a default CSV in the working directory, then in
/// `~/.project-dashboard/`.
pub fn discover_csv() -> Option<PathBuf> {
    let mut dirs_to_search = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs_to_search.push(cwd);
    }
    dirs_to_search.push(app_dir());
    discover_csv_in(&dirs_to_search)
}

fn discover_csv_in(dirs_to_search: &[PathBuf]) -> Option<PathBuf> {
    dirs_to_search
        .iter()
        .flat_map(|dir| DEFAULT_CSV_NAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
