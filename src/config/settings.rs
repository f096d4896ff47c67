//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// NarrationConfig
// ---------------------------------------------------------------------------

/// Settings for the language-model narration backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Base URL of the messages API; `/v1/messages` is appended.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Token budget for one narration.
    pub max_tokens: u32,
    /// Value of the protocol-version header.
    pub api_version: String,
    /// Upper bound on one narration round trip, in seconds.
    pub timeout_secs: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".into(),
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 500,
            api_version: "2023-06-01".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// GeocoderConfig
// ---------------------------------------------------------------------------

/// Settings for the reverse-geocoding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Base URL of a Nominatim-compatible server.
    pub base_url: String,
    /// `User-Agent` header; public Nominatim instances reject anonymous clients.
    pub user_agent: String,
    /// Preferred language for place names (`Accept-Language`).
    pub language: String,
    /// Upper bound on one lookup, in seconds.
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".into(),
            user_agent: concat!("past-port/", env!("CARGO_PKG_VERSION")).into(),
            language: "en".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// MovementConfig
// ---------------------------------------------------------------------------

/// Settings for the significant-movement filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Distance in metres that counts as a significant change.
    pub threshold_meters: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            threshold_meters: crate::location::DEFAULT_THRESHOLD_METERS,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the process-backed speech engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Text-to-speech program; the sentence is passed as its last argument.
    pub command: String,
    /// Arguments placed before the sentence (voice, rate …).
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: "espeak-ng".into(),
            // Slightly slower than the default 175 wpm, for clarity.
            args: vec!["-s".into(), "160".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// MapConfig
// ---------------------------------------------------------------------------

/// Initial map viewport before the first fix arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub default_latitude: f64,
    pub default_longitude: f64,
    /// Latitude span of the viewport in degrees.
    pub latitude_delta: f64,
    /// Longitude span of the viewport in degrees.
    pub longitude_delta: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        // New York City
        Self {
            default_latitude: 40.7128,
            default_longitude: -74.0060,
            latitude_delta: 0.01,
            longitude_delta: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// SeedDataConfig
// ---------------------------------------------------------------------------

/// Where to find the point-of-interest dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedDataConfig {
    /// Explicit path; `None` uses [`AppPaths::seed_data_file`].
    pub path: Option<PathBuf>,
}

impl SeedDataConfig {
    /// The configured path or the platform default.
    pub fn resolve(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppPaths::new().seed_data_file)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use past_port::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub narration: NarrationConfig,
    pub geocoder: GeocoderConfig,
    pub movement: MovementConfig,
    pub speech: SpeechConfig,
    pub map: MapConfig,
    pub seed_data: SeedDataConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.narration.base_url, "https://api.anthropic.com");
        assert_eq!(cfg.narration.model, "claude-sonnet-4-20250514");
        assert_eq!(cfg.narration.max_tokens, 500);
        assert_eq!(cfg.narration.api_version, "2023-06-01");
        assert_eq!(cfg.narration.timeout_secs, 30);
        assert_eq!(cfg.movement.threshold_meters, 100.0);
        assert_eq!(cfg.speech.command, "espeak-ng");
        assert!((cfg.map.default_latitude - 40.7128).abs() < 1e-9);
        assert!((cfg.map.default_longitude + 74.0060).abs() < 1e-9);
        assert!(cfg.seed_data.path.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[movement]\nthreshold_meters = 250.0\n\n[narration]\ntimeout_secs = 5\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.movement.threshold_meters, 250.0);
        assert_eq!(cfg.narration.timeout_secs, 5);
        assert_eq!(cfg.narration.model, NarrationConfig::default().model);
        assert_eq!(cfg.geocoder, GeocoderConfig::default());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.narration.base_url = "http://localhost:8080".into();
        cfg.geocoder.language = "fr".into();
        cfg.speech.command = "say".into();
        cfg.speech.args = vec![];
        cfg.seed_data.path = Some(PathBuf::from("/tmp/pois.json"));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.narration.base_url, "http://localhost:8080");
        assert_eq!(loaded.geocoder.language, "fr");
        assert_eq!(loaded.speech.command, "say");
        assert!(loaded.speech.args.is_empty());
        assert_eq!(loaded.seed_data.resolve(), PathBuf::from("/tmp/pois.json"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[movement\nthreshold_meters = ").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }
}
