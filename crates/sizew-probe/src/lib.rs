//! Stateless filesystem probes used by the measurement engine.
//!
//! Every function here absorbs its own errors and returns a "nothing known"
//! value instead of propagating `Result` — a directory that can't be
//! enumerated contributes zero bytes rather than aborting a scan.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// The directory's own last-write time, in UTC.
///
/// Any error (permission denied, vanished mid-probe, clock read failure)
/// returns `None`; the caller treats that as "no LWT known".
pub fn dir_lwt(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(err) => {
            log::trace!("dir_lwt: could not stat {}: {err}", path.display());
            return None;
        }
    };

    match metadata.modified() {
        Ok(t) => Some(DateTime::<Utc>::from(t)),
        Err(err) => {
            log::trace!("dir_lwt: no mtime for {}: {err}", path.display());
            None
        }
    }
}

/// Sum of the lengths of regular files directly inside `path` (no recursion).
///
/// Per-file errors are swallowed and that file contributes zero. A failure
/// to enumerate `path` itself returns 0.
pub fn own_files_size(path: &Path) -> u64 {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            log::trace!("own_files_size: could not read {}: {err}", path.display());
            return 0;
        }
    };

    let mut total: u64 = 0;
    for entry in entries.flatten() {
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if !file_type.is_file() {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            total = total.saturating_add(metadata.len());
        }
    }

    total
}

/// Absolute paths of the immediate, non-reparse-point subdirectories of `path`.
///
/// Entries that are symlinks, junctions, or mount points are omitted to
/// prevent cycles and double-counting. Enumeration errors yield an empty
/// `Vec`.
pub fn child_dirs(path: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            log::trace!("child_dirs: could not read {}: {err}", path.display());
            return Vec::new();
        }
    };

    let mut children = Vec::new();
    for entry in entries.flatten() {
        let child_path = entry.path();

        if is_reparse_point(&child_path) {
            continue;
        }

        match entry.file_type() {
            Ok(ft) if ft.is_dir() => children.push(child_path),
            _ => {}
        }
    }

    children
}

/// True if `path` is a symlink (Unix) or carries the reparse-point
/// attribute (Windows junctions / mount points).
fn is_reparse_point(path: &Path) -> bool {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };

    if metadata.file_type().is_symlink() {
        return true;
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
        return metadata.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0;
    }

    #[cfg(not(windows))]
    {
        false
    }
}
