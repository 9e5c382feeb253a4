use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::graph::Edge;
use crate::overlay;
use crate::version::Version;
use crate::{MigrateError, Result};

/// Reserved directory holding scripts shared across drivers, merged under a
/// real driver directory.
pub const COMMON_DIR: &str = "_common";

/// Reserved directory standing in for the driver directory when no
/// driver-specific tree exists.
pub const GENERIC_DIR: &str = "_generic";

static INSTALL_SHAPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9][0-9.]*$").unwrap());
static TRANSITION_SHAPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9][0-9.]*)-([0-9][0-9.]*)$").unwrap());

enum Classified {
    Install(Version),
    Transition(Version, Version),
    Ignored,
}

// A name that looks like a version but fails strict parse is an error
// (BadVersionSyntax); names of any other shape are skipped.
fn classify(name: &str) -> Result<Classified> {
    if let Some(caps) = TRANSITION_SHAPED.captures(name) {
        let from = Version::parse(&caps[1])?;
        let to = Version::parse(&caps[2])?;
        return Ok(Classified::Transition(from, to));
    }
    if INSTALL_SHAPED.is_match(name) {
        return Ok(Classified::Install(Version::parse(name)?));
    }
    Ok(Classified::Ignored)
}

/// Pick the directory that holds the active driver's scripts: the driver's
/// own directory when present, else `_generic`, else nothing.
pub fn driver_dir(root: &Path, driver: &str) -> Option<String> {
    if root.join(driver).is_dir() {
        Some(driver.to_string())
    } else if root.join(GENERIC_DIR).is_dir() {
        Some(GENERIC_DIR.to_string())
    } else {
        None
    }
}

/// Enumerate a schema root for one driver and classify its leaf directories
/// into migration edges.
///
/// Install directories become edges from zero; transition directories become
/// edges between their two versions. Directory names come from the union of
/// the active driver tree and `_common`, so a version that only exists under
/// `_common` still contributes an edge. A root with no usable driver
/// directory yields no edges.
pub fn scan(root: &Path, driver: &str) -> Result<Vec<Edge>> {
    let Some(active) = driver_dir(root, driver) else {
        warn!(
            "schema root {} has neither a '{}' directory nor '{}'",
            root.display(),
            driver,
            GENERIC_DIR
        );
        return Ok(Vec::new());
    };

    let mut names = BTreeSet::new();
    collect_dir_names(&root.join(&active), &mut names)?;
    if active != GENERIC_DIR {
        collect_dir_names(&root.join(COMMON_DIR), &mut names)?;
    }

    let mut edges = Vec::new();
    for name in names {
        match classify(&name)? {
            Classified::Install(to) => edges.push(Edge {
                from: Version::zero(),
                to,
                dir_name: name.clone(),
                scripts: overlay::resolve(root, &active, &name)?,
            }),
            Classified::Transition(from, to) => edges.push(Edge {
                from,
                to,
                dir_name: name.clone(),
                scripts: overlay::resolve(root, &active, &name)?,
            }),
            Classified::Ignored => {
                warn!(
                    "ignoring unrecognized directory '{}' under {}",
                    name,
                    root.display()
                );
            }
        }
    }
    Ok(edges)
}

fn collect_dir_names(dir: &Path, into: &mut BTreeSet<String>) -> Result<()> {
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
        if entry.path().is_dir() {
            into.insert(name);
        }
    }
    Ok(())
}
