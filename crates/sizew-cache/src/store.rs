use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::codec::{read_store, write_store};
use crate::entry::CacheEntry;
use crate::path_key::{is_descendant_of, NormalizedPath};

/// In-memory index from normalized absolute directory path to `CacheEntry`,
/// mirrored to a binary file on disk. Not thread-safe: the measurement
/// engine assumes exclusive access for the duration of one invocation.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<NormalizedPath, CacheEntry>,
    current_root: Option<NormalizedPath>,
    dirty: bool,
}

impl Store {
    pub fn empty() -> Self {
        Store::default()
    }

    /// Opens the cache file at `path` read-only. Missing files, unreadable
    /// files, and header mismatches all yield an empty store — never an
    /// error — per the persistence design.
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                log::debug!("no existing cache at {}: {err}", path.display());
                return Store::empty();
            }
        };

        Store {
            entries: read_store(file),
            current_root: None,
            dirty: false,
        }
    }

    /// Writes the store to `path` if dirty; a no-op otherwise. Pruning must
    /// be applied (via `prune_unvisited_under_root`) before calling this if
    /// the scan was recursive.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            write_store(file, self.entries.iter().map(|(p, e)| (p.clone(), e.clone())))
                .map_err(|err| anyhow!("failed writing cache: {err}"))?;
        }
        fs::rename(&temp_path, path)?;

        self.dirty = false;
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        let key = NormalizedPath::new(path)?;
        self.entries.get(&key)
    }

    pub fn insert_or_replace(&mut self, path: &Path, entry: CacheEntry) {
        if let Some(key) = NormalizedPath::new(path) {
            self.entries.insert(key, entry);
            self.dirty = true;
        }
    }

    /// Marks the entry for `path` visited during the current invocation,
    /// if one exists.
    pub fn mark_visited(&mut self, path: &Path) {
        if let Some(key) = NormalizedPath::new(path) {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.visited = true;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedPath, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn set_current_root(&mut self, path: &Path) {
        self.current_root = NormalizedPath::new(path);
    }

    /// Removes every entry at or beneath `current_root` whose `visited`
    /// flag is false. Only called for recursive scans: a non-recursive
    /// scan never enumerated children and has no authority to delete them.
    pub fn prune_unvisited_under_root(&mut self) {
        let Some(root) = self.current_root.clone() else {
            return;
        };
        let root_path = root.to_path_buf();

        let before = self.entries.len();
        self.entries
            .retain(|key, entry| !(is_descendant_of(key.as_path(), &root_path) && !entry.visited));

        if self.entries.len() != before {
            self.dirty = true;
        }
    }
}

/// Resolves the default cache file location: a per-user cache directory
/// under a fixed subfolder, falling back to a location next to the running
/// executable if that directory cannot be created.
pub fn get_cache_path() -> Result<PathBuf> {
    if let Some(dir) = platform_cache_dir() {
        if fs::create_dir_all(&dir).is_ok() {
            return Ok(dir.join("cache.bin"));
        }
    }

    let exe_dir = std::env::current_exe()?
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("could not determine executable directory"))?;
    Ok(exe_dir.join("sizew-cache.bin"))
}

pub fn get_cache_path_custom(custom_dir: Option<&str>) -> Result<PathBuf> {
    match custom_dir {
        Some(dir) => Ok(PathBuf::from(dir).join("cache.bin")),
        None => get_cache_path(),
    }
}

#[cfg(windows)]
fn platform_cache_dir() -> Option<PathBuf> {
    let appdata = std::env::var("APPDATA").ok()?;
    Some(PathBuf::from(appdata).join("sizew"))
}

#[cfg(not(windows))]
fn platform_cache_dir() -> Option<PathBuf> {
    if let Some(cache_home) = parse_absolute_dir_env("XDG_CACHE_HOME") {
        return Some(cache_home.join("sizew"));
    }

    let home = std::env::var("HOME").ok()?;
    let home_path = PathBuf::from(home);
    home_path.is_absolute().then(|| home_path.join(".cache").join("sizew"))
}

#[cfg(not(windows))]
fn parse_absolute_dir_env(var_name: &str) -> Option<PathBuf> {
    let raw = std::env::var(var_name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = PathBuf::from(trimmed);
    path.is_absolute().then_some(path)
}
