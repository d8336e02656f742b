//! Source directory management.

use std::path::Path;

use crate::config::{self, Config};
use crate::model::{MediaClass, SourceRoot};

/// Add a source directory to the config file at `config_path`
pub fn cmd_add_source(config_path: &Path, path: &Path, class: MediaClass) -> anyhow::Result<()> {
    let path = std::path::absolute(path)?;
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }

    let mut config = config::load_from(config_path);
    if config.library.sources.iter().any(|s| s.path == path) {
        println!("{} is already a source", path.display());
        return Ok(());
    }

    config.library.sources.push(SourceRoot::new(&path, class));
    config::save_to(&config, config_path)?;
    println!("Added {} source {}", class, path.display());
    Ok(())
}

/// Print the configured sources
pub fn cmd_sources(config: &Config) -> anyhow::Result<()> {
    if config.library.sources.is_empty() {
        println!("No sources configured. Add one with `media-minder add-source <path> --class <class>`.");
    }
    for source in &config.library.sources {
        println!("{:<6} {}", source.class.as_str(), source.path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_source_is_saved_once() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("tv");
        std::fs::create_dir_all(&media).unwrap();
        let config_path = dir.path().join("config.toml");

        cmd_add_source(&config_path, &media, MediaClass::Show).unwrap();
        cmd_add_source(&config_path, &media, MediaClass::Show).unwrap();

        let config = config::load_from(&config_path);
        assert_eq!(config.library.sources, vec![SourceRoot::new(&media, MediaClass::Show)]);
    }

    #[test]
    fn test_add_source_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = cmd_add_source(&dir.path().join("config.toml"), &dir.path().join("nope"), MediaClass::Movie);
        assert!(result.is_err());
    }
}
