//! Writing and removing unit files in the output directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::partition::SourceUnit;

/// Create `dir` (and parents) if missing. Returns `true` when it was created.
pub fn prepare_output_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    info!(dir = %dir.display(), "created output dir");
    Ok(true)
}

/// Write each unit to `dir/<name>.<ext>`, overwriting existing files.
///
/// Returns the written paths in unit order. `dir` must already exist.
pub fn materialize(units: &[SourceUnit], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(units.len());
    for unit in units {
        let path = dir.join(unit.file_name());
        if paths.contains(&path) {
            warn!(path = %path.display(), "duplicate type name, later unit overwrites earlier one");
        }
        fs::write(&path, unit.contents())
            .with_context(|| format!("write unit {}", path.display()))?;
        debug!(path = %path.display(), bytes = unit.body.len(), "unit written");
        paths.push(path);
    }
    Ok(paths)
}

/// Delete a rejected unit file. A file that is already gone is not an error.
pub fn discard_unit(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "unit discarded");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove unit {}", path.display())),
    }
}
