use crate::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories following the XDG base directory layout
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/bangs)
    pub config: PathBuf,

    /// Data directory (~/.local/share/bangs)
    pub data: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Key/value storage file
    pub storage_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard XDG paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the system's project directories cannot be determined.
    pub fn new() -> Result<Self> {
        let project = ProjectDirs::from("", "", "bangs")
            .ok_or_else(|| Error::Config("Failed to determine project directories".to_string()))?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();

        Ok(Self {
            config_file: config.join("config.json"),
            storage_file: data.join("storage.json"),
            config,
            data,
        })
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            storage_file: base.join("storage.json"),
            config: base.clone(),
            data: base,
        }
    }
}
