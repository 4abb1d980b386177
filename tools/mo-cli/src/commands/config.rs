//! Show or write the configuration file.

use std::path::PathBuf;

use mo_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<PathBuf>, write: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);

    if write {
        AppConfig::default()
            .save_to(&path)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let source = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({source})", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
