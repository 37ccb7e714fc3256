//! Plugin settings.
//!
//! Settings live in a JSON5 file (comments and trailing commas allowed) using
//! the same keys as `ClangTidy.sublime-settings`. A missing file means every
//! setting takes its default.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{LazyLock, Mutex},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "ClangTidy.sublime-settings";

/// Executable looked up when no `clang-tidy` setting is given
pub const DEFAULT_EXECUTABLE: &str = "clang-tidy";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] json5::Error),
}

/// User configurable behavior of the plugin
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run automatically after every save
    pub run_on_save: bool,

    /// Program name or path of the `clang-tidy` executable
    #[serde(rename = "clang-tidy")]
    pub clang_tidy: String,

    /// Extra arguments appended after the built-in compiler flags
    pub args: Vec<String>,

    /// Show an error dialog when a run fails
    pub show_errors: bool,

    /// Kill the tool if it runs longer than this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            run_on_save: false,
            clang_tidy: DEFAULT_EXECUTABLE.to_string(),
            args: vec![],
            show_errors: true,
            timeout_secs: None,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl FromStr for Settings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(json5::from_str(s)?)
    }
}

static ROOT_DIR: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Overrides the directory the settings file is looked up in.
///
/// By default this is `~/.local/clang_tidy_runner`.
///
/// # Panics
///
/// * If the `ROOT_DIR` `Mutex` is poisoned
pub fn set_root_dir(path: PathBuf) {
    *ROOT_DIR.lock().unwrap() = Some(path);
}

/// Returns the directory the settings file is looked up in
///
/// # Panics
///
/// * If the `ROOT_DIR` `Mutex` is poisoned
#[must_use]
pub fn get_config_dir_path() -> Option<PathBuf> {
    let root_dir = ROOT_DIR.lock().unwrap();

    if root_dir.is_some() {
        return root_dir.clone();
    }

    home::home_dir().map(|home| home.join(".local").join("clang_tidy_runner"))
}

/// Returns the default settings file path
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    get_config_dir_path().map(|dir| dir.join(SETTINGS_FILE))
}

/// Loads settings from `path`, falling back to the defaults if the file does
/// not exist.
///
/// # Errors
///
/// * If the settings file cannot be read
/// * If the settings file is malformed
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        log::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)?;
    let settings: Settings = content.parse()?;
    log::debug!("Loaded settings from {}: {settings:?}", path.display());

    Ok(settings)
}

/// Loads settings from [`default_settings_path`]
///
/// # Errors
///
/// * If the settings file cannot be read
/// * If the settings file is malformed
pub fn load_default_settings() -> Result<Settings, SettingsError> {
    match default_settings_path() {
        Some(path) => load_settings(&path),
        None => {
            log::warn!("Could not determine the config dir, using default settings");
            Ok(Settings::default())
        }
    }
}
