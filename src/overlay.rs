use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scanner::{COMMON_DIR, GENERIC_DIR};
use crate::{MigrateError, Result};

/// One migration script, identified by its base name.
///
/// Scripts discovered on disk keep their path and are read lazily at
/// execution time; the engine's own bootstrap schema ships as embedded
/// bodies.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub source: ScriptSource,
}

#[derive(Debug, Clone)]
pub enum ScriptSource {
    File(PathBuf),
    Embedded(&'static str),
}

impl Script {
    pub fn file(name: String, path: PathBuf) -> Self {
        Script {
            name,
            source: ScriptSource::File(path),
        }
    }

    pub fn embedded(name: &str, body: &'static str) -> Self {
        Script {
            name: name.to_string(),
            source: ScriptSource::Embedded(body),
        }
    }

    pub fn read_body(&self) -> Result<String> {
        match &self.source {
            ScriptSource::File(path) => {
                fs::read_to_string(path).map_err(|source| MigrateError::ScriptReadFailure {
                    path: path.clone(),
                    source,
                })
            }
            ScriptSource::Embedded(body) => Ok((*body).to_string()),
        }
    }
}

/// Compose the script list for directory `dir` by overlaying the driver
/// directory over `_common`.
///
/// The result is the union of base names from `<driver>/<dir>` and
/// `_common/<dir>`, the driver file winning when both exist, sorted by base
/// name. When the active driver directory is `_generic` it stands alone;
/// `_common` only participates under a real driver directory. Hidden files
/// are skipped.
pub fn resolve(root: &Path, driver_dir: &str, dir: &str) -> Result<Vec<Script>> {
    let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
    if driver_dir != GENERIC_DIR {
        collect_files(&root.join(COMMON_DIR).join(dir), &mut by_name)?;
    }
    collect_files(&root.join(driver_dir).join(dir), &mut by_name)?;

    Ok(by_name
        .into_iter()
        .map(|(name, path)| Script::file(name, path))
        .collect())
}

fn collect_files(dir: &Path, into: &mut BTreeMap<String, PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = fs::read_dir(dir).map_err(|source| MigrateError::ScriptReadFailure {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MigrateError::ScriptReadFailure {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            into.insert(name, path);
        }
    }
    Ok(())
}
