use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn observability_enabled() -> bool {
    match std::env::var("QUILLMATE_OBSERVABILITY") {
        Ok(value) => parse_bool_env(&value).unwrap_or(true),
        Err(_) => true,
    }
}

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("QUILLMATE_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

const DEFAULT_LOG_FILE: &str = "quillmate.logs.jsonl";

/// Directory and file name for the JSON log; a bare directory path gets the
/// default file name.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if !path.as_os_str().to_string_lossy().ends_with('/') => {
            (dir, name.to_string())
        }
        _ => (path.to_path_buf(), DEFAULT_LOG_FILE.to_string()),
    }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `QUILLMATE_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `QUILLMATE_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `QUILLMATE_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact console format.
/// - `RUST_LOG`: fallback filter.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if !observability_enabled() {
            return;
        }

        let env_filter = resolve_env_filter();
        if let Some(path) = std::env::var_os("QUILLMATE_JSON_LOG_PATH") {
            let (dir, file_name) = split_log_path(Path::new(&path));
            let _ = std::fs::create_dir_all(&dir);
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            // stdout carries the edited document in the CLI.
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool_env(" On "), Some(true));
        assert_eq!(parse_bool_env("disabled"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn log_path_splits_into_dir_and_file() {
        assert_eq!(
            split_log_path(Path::new("logs/run.jsonl")),
            (PathBuf::from("logs"), "run.jsonl".to_string())
        );
        assert_eq!(
            split_log_path(Path::new("run.jsonl")),
            (PathBuf::from("."), "run.jsonl".to_string())
        );
    }

    #[test]
    fn trailing_slash_uses_default_file_name() {
        assert_eq!(
            split_log_path(Path::new("logs/")),
            (PathBuf::from("logs/"), DEFAULT_LOG_FILE.to_string())
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
    }
}
