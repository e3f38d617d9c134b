use std::path::{Path, PathBuf};

/// Loads `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Settings file used when `--settings` is not given.
pub fn default_settings_path() -> PathBuf {
    match std::env::var_os("QUILLMATE_SETTINGS_PATH") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(".quillmate/settings.json"),
    }
}
