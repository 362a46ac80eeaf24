//! Scratch copies of the distribution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{HarnessError, Result};

/// Recursively copy `source` into `target`, creating `target` if needed.
///
/// File permissions are preserved so scripts stay executable; symlinks are
/// recreated rather than followed.
pub fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    match fs::create_dir(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }
    fs::set_permissions(target, fs::metadata(source)?.permissions())?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let link = fs::read_link(from)?;
    std::os::unix::fs::symlink(link, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Recursively delete `path`. A missing path is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// A staged copy of the distribution, removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    name: String,
    removed: bool,
}

impl ScratchDir {
    /// Copy `template` to `<parent>/<name>`, replacing any leftover directory
    /// of the same name from an earlier run.
    pub fn create(template: &Path, parent: &Path, name: &str) -> Result<Self> {
        let path = parent.join(name);
        let stage_error = |source| HarnessError::Stage {
            path: path.clone(),
            source,
        };

        if path.starts_with(template) || template.starts_with(&path) {
            return Err(stage_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "scratch directory overlaps the template {}",
                    template.display()
                ),
            )));
        }

        remove_tree(&path).map_err(stage_error)?;
        fs::create_dir_all(parent).map_err(stage_error)?;

        debug!("Staging {} -> {}", template.display(), path.display());
        let scratch = Self {
            path: path.clone(),
            name: name.to_string(),
            removed: false,
        };
        // On a partial copy the returned error drops `scratch`, which cleans up.
        copy_tree(template, &path).map_err(stage_error)?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path name under test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delete the scratch directory, reporting failures.
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        remove_tree(&self.path).map_err(|source| HarnessError::Stage {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            warn!("Could not delete directory '{}': {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests;
