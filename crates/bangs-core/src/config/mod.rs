mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{Config, OmniboxConfig, StorageConfig};
pub use validation::warn_unknown_fields;
