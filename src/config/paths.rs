//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\finfinder\
//!   macOS:   ~/Library/Application Support/finfinder/
//!   Linux:   ~/.config/finfinder/
//!
//! Data dir (fish catalog):
//!   Windows: %LOCALAPPDATA%\finfinder\
//!   macOS:   ~/Library/Application Support/finfinder/
//!   Linux:   ~/.local/share/finfinder/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory searched for user-provided catalog files.
    pub data_dir: PathBuf,
    /// Catalog file picked up when no explicit path is configured.
    pub default_catalog_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "finfinder";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let default_catalog_file = data_dir.join("fish.csv");

        Self {
            config_dir,
            settings_file,
            data_dir,
            default_catalog_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
