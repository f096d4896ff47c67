//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + credentials):
//!   Windows: %APPDATA%\past-port\
//!   macOS:   ~/Library/Application Support/past-port/
//!   Linux:   ~/.config/past-port/
//!
//! Data dir (seed point-of-interest data):
//!   Windows: %LOCALAPPDATA%\past-port\
//!   macOS:   ~/Library/Application Support/past-port/
//!   Linux:   ~/.local/share/past-port/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `credentials.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `credentials.toml` (persisted API key).
    pub credentials_file: PathBuf,
    /// Full path to the bundled point-of-interest dataset.
    pub seed_data_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "past-port";

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
        let credentials_file = config_dir.join("credentials.toml");
        let seed_data_file = data_dir.join("seed_data.json");

        Self {
            config_dir,
            settings_file,
            credentials_file,
            seed_data_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
