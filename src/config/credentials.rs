//! API-key persistence.
//!
//! [`CredentialStore`] is what the tour orchestrator talks to when the user
//! sets a key.  [`FileCredentialStore`] keeps the key in a small TOML file
//! under the fixed `claude_api_key` name and lets an environment variable
//! override it at load time.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::AppPaths;

/// Name the key is persisted under.
pub const API_KEY_NAME: &str = "claude_api_key";

/// Environment variable checked before the persisted value.
pub const API_KEY_ENV: &str = "CLAUDE_API_KEY";

// ---------------------------------------------------------------------------
// CredentialError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("cannot access credential file: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is malformed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode credentials: {0}")]
    Encode(#[from] toml::ser::Error),
}

// ---------------------------------------------------------------------------
// CredentialStore trait
// ---------------------------------------------------------------------------

/// Storage for the narration backend's API key.
pub trait CredentialStore: Send {
    /// The key to use at startup, if any.  Empty strings count as absent.
    fn load_api_key(&self) -> Option<String>;

    /// Persist `key` so the next start picks it up.
    fn save_api_key(&mut self, key: &str) -> Result<(), CredentialError>;
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// TOML-file backed store with an environment-variable override.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    env_override: Option<String>,
}

impl FileCredentialStore {
    /// Store at the platform `credentials.toml`, overridable by
    /// `CLAUDE_API_KEY`.
    pub fn new() -> Self {
        Self::at(AppPaths::new().credentials_file).with_env_override(API_KEY_ENV)
    }

    /// Store at an explicit path with no environment override.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_override: None,
        }
    }

    /// Check environment variable `var` before the file when loading.
    pub fn with_env_override(mut self, var: &str) -> Self {
        self.env_override = Some(var.to_string());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<toml::Table, CredentialError> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write `content` readable by the owner only.
    #[cfg(unix)]
    fn write_private(&self, content: &str) -> std::io::Result<()> {
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)?;
        // `mode` only applies on creation.
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(content.as_bytes())
    }

    #[cfg(not(unix))]
    fn write_private(&self, content: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, content)
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_api_key(&self) -> Option<String> {
        if let Some(var) = &self.env_override {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    log::debug!("credentials: using API key from ${var}");
                    return Some(key);
                }
            }
        }

        match self.read_file() {
            Ok(table) => table
                .get(API_KEY_NAME)
                .and_then(toml::Value::as_str)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            Err(e) => {
                log::warn!(
                    "credentials: cannot read {} ({e}); treating as unset",
                    self.path.display()
                );
                None
            }
        }
    }

    fn save_api_key(&mut self, key: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut table = toml::Table::new();
        table.insert(API_KEY_NAME.to_string(), toml::Value::String(key.to_string()));
        self.write_private(&toml::to_string_pretty(&table)?)?;
        log::info!("credentials: API key saved to {}", self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// In-memory store; clones share the same slot so tests can inspect it.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    pub key: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

#[cfg(test)]
impl MemoryCredentialStore {
    pub fn with_key(key: &str) -> Self {
        let store = Self::default();
        *store.key.lock().unwrap() = Some(key.to_string());
        store
    }
}

#[cfg(test)]
impl CredentialStore for MemoryCredentialStore {
    fn load_api_key(&self) -> Option<String> {
        self.key.lock().unwrap().clone().filter(|k| !k.is_empty())
    }

    fn save_api_key(&mut self, key: &str) -> Result<(), CredentialError> {
        *self.key.lock().unwrap() = Some(key.to_string());
        Ok(())
    }
}
