//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and the API-key credential store.

pub mod credentials;
pub mod paths;
pub mod settings;

pub use credentials::{
    CredentialError, CredentialStore, FileCredentialStore, API_KEY_ENV, API_KEY_NAME,
};
pub use paths::AppPaths;
pub use settings::{
    AppConfig, GeocoderConfig, MapConfig, MovementConfig, NarrationConfig, SeedDataConfig,
    SpeechConfig,
};

#[cfg(test)]
pub use credentials::MemoryCredentialStore;
