pub mod file;
mod serde_duration;
mod settings;

pub use self::{
    file::File,
    settings::{CndSettings, Settings},
};

use anyhow::Context;
use std::path::Path;

/// Read the configuration file at `path` and fill in defaults for
/// everything it does not mention.
pub fn read_config(path: &Path) -> anyhow::Result<Settings> {
    let file = File::read(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    Ok(Settings::from_config_file_and_defaults(file))
}
