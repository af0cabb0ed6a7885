//! Directory copy helpers
//!
//! Recursive copy is an external-collaborator concern; this is the minimal
//! boundary the publish commands need.

use std::io;
use std::path::Path;

/// Recursively copy `src` into `dst`, creating `dst`
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove a directory tree if it exists
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Replace `dst` with a copy of `src`
pub fn replace_dir(src: &Path, dst: &Path) -> io::Result<()> {
    remove_dir_if_exists(dst)?;
    copy_dir(src, dst)
}
