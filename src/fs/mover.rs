//! Local file moves and empty-directory pruning.
//!
//! Moves try `rename` first (instant on the same filesystem) and fall back to
//! copy + delete when the destination lives on another volume. A move never
//! replaces an existing destination.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

/// Copy a single file, creating parent directories as needed.
fn copy_file_local(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;

    Ok(())
}

/// Move a file to `dst`, refusing to overwrite.
///
/// Returns an error of kind [`io::ErrorKind::AlreadyExists`] (wrapped) when the
/// destination is taken.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if dst.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination already exists: {}", dst.display()),
        )
        .into());
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_across(src, dst, copy_file_local)
        }
        Err(e) => Err(e)
            .with_context(|| format!("Failed to move {} to {}", src.display(), dst.display())),
    }
}

/// Copy then delete the source; on any failure only one copy survives.
fn copy_across<F>(src: &Path, dst: &Path, copy: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> Result<()>,
{
    if let Err(err) = copy(src, dst) {
        // A truncated destination must not outlive the intact source.
        let _ = fs::remove_file(dst);
        return Err(err);
    }
    if let Err(remove_err) = fs::remove_file(src) {
        let _ = fs::remove_file(dst);
        return Err(remove_err)
            .with_context(|| format!("Failed to remove source file: {}", src.display()));
    }
    Ok(())
}

/// Whether an error chain produced by [`move_file`] is a destination clash.
pub fn is_already_exists(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == io::ErrorKind::AlreadyExists)
}

/// Remove `dir` if it (recursively) contains only empty directories.
///
/// Returns `Ok(true)` when the directory is gone, `Ok(false)` when files remain.
pub fn prune_empty_dirs(dir: &Path) -> Result<bool> {
    let mut empty = true;
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if !prune_empty_dirs(&entry.path())? {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    if empty {
        fs::remove_dir(dir)
            .with_context(|| format!("Failed to remove directory: {}", dir.display()))?;
    }
    Ok(empty)
}
