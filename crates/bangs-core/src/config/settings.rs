use crate::Result;
use crate::search::ParamEncoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub omnibox: OmniboxConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Address-bar behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmniboxConfig {
    /// Shown above the suggestions before anything matches
    #[serde(default = "default_description")]
    pub default_description: String,

    /// How long a query may wait for the dataset; 0 waits indefinitely
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    #[serde(default)]
    pub param_encoding: ParamEncoding,
}

impl OmniboxConfig {
    #[must_use]
    pub fn ready_timeout(&self) -> Option<Duration> {
        (self.ready_timeout_ms > 0).then(|| Duration::from_millis(self.ready_timeout_ms))
    }
}

fn default_description() -> String {
    "Go Bangs : enter a bang to suggest a website.".to_string()
}
fn default_ready_timeout() -> u64 {
    5000
}

impl Default for OmniboxConfig {
    fn default() -> Self {
        Self {
            default_description: default_description(),
            ready_timeout_ms: default_ready_timeout(),
            param_encoding: ParamEncoding::default(),
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Storage file; defaults to `storage.json` in the data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Default dataset file; defaults to the bundled dataset
    #[serde(default)]
    pub default_bangs: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(
            config.omnibox.default_description,
            "Go Bangs : enter a bang to suggest a website."
        );
        assert_eq!(config.omnibox.ready_timeout_ms, 5000);
        assert_eq!(config.omnibox.param_encoding, ParamEncoding::Raw);
        assert!(config.storage.path.is_none());
        assert!(config.storage.default_bangs.is_none());
    }

    #[test]
    fn test_config_load_nonexistent_returns_default() {
        let path = Path::new("/nonexistent/path/config.json");
        let config = Config::load(path).unwrap();
        assert_eq!(config.omnibox.ready_timeout_ms, 5000);
    }

    #[test]
    fn test_config_load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"omnibox": {{"paramEncoding": "percent", "readyTimeoutMs": 250}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.omnibox.param_encoding, ParamEncoding::Percent);
        assert_eq!(config.omnibox.ready_timeout_ms, 250);
        assert_eq!(
            config.omnibox.default_description,
            "Go Bangs : enter a bang to suggest a website."
        );
    }

    #[test]
    fn test_config_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_ready_timeout_zero_is_unbounded() {
        let omnibox = OmniboxConfig {
            ready_timeout_ms: 0,
            ..OmniboxConfig::default()
        };
        assert!(omnibox.ready_timeout().is_none());
        assert_eq!(
            OmniboxConfig::default().ready_timeout(),
            Some(Duration::from_millis(5000))
        );
    }
}
