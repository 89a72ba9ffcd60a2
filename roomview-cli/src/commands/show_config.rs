//! Config command implementation

use crate::config::{self, Config};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Print the effective configuration as TOML, optionally writing it out
pub fn show_config(config: &Config, write: Option<PathBuf>) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("failed to render configuration")?;
    print!("{}", rendered);

    if let Some(path) = write {
        config::save_config(config, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
