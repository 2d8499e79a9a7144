//! Turn command line arguments into a [`ConfigSet`].
//!
//! Each argument is tried, in order, as a directory, a file, an inline YAML
//! mapping and finally a glob pattern.

use super::config::Config;
use super::config_set::ConfigSet;
use crate::traits::FileSystem;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// File extensions picked up when a directory is given
const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "jinja"];

/// Load every config named by `sources`.
///
/// Configs without a `project` take `default_project`. Two configs resolving
/// to the same `project.name` are an error.
pub fn load_configs(
    fs: &dyn FileSystem,
    sources: &[String],
    default_project: Option<&str>,
) -> Result<ConfigSet> {
    let mut configs = ConfigSet::new();

    for source in sources {
        for config in load_source(fs, source, default_project)? {
            tracing::debug!("Loaded config {} from {}", config.full_name(), source);
            configs.try_insert(config)?;
        }
    }

    if configs.is_empty() {
        anyhow::bail!("No configs found in: {}", sources.join(", "));
    }

    Ok(configs)
}

fn load_source(fs: &dyn FileSystem, source: &str, default_project: Option<&str>) -> Result<Vec<Config>> {
    let path = Path::new(source);

    if fs.is_dir(path) {
        let files = config_files_in(fs, path)?;
        if files.is_empty() {
            anyhow::bail!("No config files (*.yaml, *.yml, *.jinja) found in directory {}", source);
        }
        return files
            .iter()
            .map(|file| load_file(fs, file, default_project))
            .collect();
    }

    if fs.is_file(path) {
        return Ok(vec![load_file(fs, path, default_project)?]);
    }

    if is_yaml_mapping(source) {
        return Ok(vec![Config::parse(source, None, default_project)?]);
    }

    let files = fs.glob(source)?;
    if files.is_empty() {
        anyhow::bail!("{} is not a file, a directory, a YAML config or a glob matching any file", source);
    }

    files
        .iter()
        .map(|file| load_file(fs, file, default_project))
        .collect()
}

fn load_file(fs: &dyn FileSystem, path: &Path, default_project: Option<&str>) -> Result<Config> {
    let data = fs
        .read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    Ok(Config::parse(&data, Some(path), default_project)?)
}

/// Config files directly inside `dir`, sorted by path
fn config_files_in(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| CONFIG_EXTENSIONS.contains(&e))
        })
        .collect();

    files.sort();
    Ok(files)
}

fn is_yaml_mapping(source: &str) -> bool {
    matches!(serde_yaml::from_str::<Value>(source), Ok(Value::Mapping(_)))
}
