//! The measurement engine: ties `sizew-probe`'s filesystem reads and
//! `sizew-cache`'s persisted `Store` together behind the decision table
//! that decides, for each directory, whether to trust the cache, deep-skip,
//! shallow-trust, or recompute.

mod measure;
pub mod stability;

use std::path::{Path, PathBuf};

use anyhow::Result;
use sizew_cache::{get_cache_path_custom, Store};
use sizew_core::SizewError;
use stability::{OsEntropySource, StabilitySource};

pub use measure::{measure, LWT_TOLERANCE_SECONDS};

/// Resolves `path` to an absolute path, joining it onto the current
/// directory if it is relative. Does not touch the filesystem otherwise
/// (no symlink resolution) — every `Store` key must be an absolute path
/// (SPEC_FULL.md §3), so this runs once at the engine's entry points
/// rather than inside the recursive decision core, which would otherwise
/// silently fail to cache anything reached through a relative root (e.g.
/// the common CLI invocation `sizew .`).
fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty path"));
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `absolutize`, logging and returning `None` on failure — the "invalid
/// input" error class from SPEC_FULL.md §7 (empty path, or a path that
/// fails to normalize to absolute form), surfaced through the logging
/// channel since the zero-returning entry points have no `Err` to give it.
fn absolutize_or_log(path: &Path) -> Option<PathBuf> {
    match absolutize(path) {
        Ok(abs) => Some(abs),
        Err(err) => {
            log::error!("invalid input: could not resolve an absolute path for {}: {err}", path.display());
            None
        }
    }
}

/// Measures `path`, loading and saving the default cache file as needed.
///
/// Returns 0 (rather than erroring) for a path that does not exist, cannot
/// be read, or cannot be resolved to an absolute path — consistent with
/// `sizew-probe`'s error-absorbing contract. Use [`try_measure_directory`]
/// to reject the "does not exist" case explicitly. Cache I/O failures
/// (cache path resolution, load, or save) are logged and otherwise
/// ignored — the call still returns the freshly computed total.
pub fn measure_directory(path: &Path, recursive: bool, bypass_cache: bool, recalculate: bool) -> Result<u64> {
    measure_directory_at(path, recursive, bypass_cache, recalculate, None)
}

/// Like [`measure_directory`], but fails fast if `path` is not a directory
/// that exists right now, instead of silently returning 0.
pub fn try_measure_directory(path: &Path, recursive: bool, bypass_cache: bool, recalculate: bool) -> Result<u64> {
    if !path.is_dir() {
        return Err(SizewError::InvalidInput(format!("not a directory: {}", path.display())).into());
    }
    measure_directory(path, recursive, bypass_cache, recalculate)
}

/// Measures `path` against a custom cache directory rather than the
/// platform default. `cache_dir` is a directory, not a file path.
pub fn measure_directory_in(
    path: &Path,
    recursive: bool,
    bypass_cache: bool,
    recalculate: bool,
    cache_dir: Option<&str>,
) -> Result<u64> {
    measure_directory_at(path, recursive, bypass_cache, recalculate, cache_dir)
}

/// Always returns `Ok`: resolving the cache path, loading the cache, and
/// saving it back are all absorbed per SPEC_FULL.md §7 class 2 ("cache I/O
/// errors ... absorbed; the engine proceeds as if the cache were empty or
/// the save succeeded") rather than propagated — only the computed total
/// is guaranteed, never a cache write.
fn measure_directory_at(
    path: &Path,
    recursive: bool,
    bypass_cache: bool,
    recalculate: bool,
    cache_dir: Option<&str>,
) -> Result<u64> {
    let cache_path = match get_cache_path_custom(cache_dir) {
        Ok(cache_path) => Some(cache_path),
        Err(err) => {
            log::warn!("could not resolve cache file location, proceeding without a cache: {err}");
            None
        }
    };

    let mut store = cache_path.as_deref().map(Store::load).unwrap_or_default();

    let total = measure_directory_with_store(path, recursive, bypass_cache, recalculate, &mut store);

    if let Some(cache_path) = &cache_path {
        if let Err(err) = store.save(cache_path) {
            log::warn!("failed to save cache to {}: {err}", cache_path.display());
        }
    }

    Ok(total)
}

/// Measures `path` against an already-open `Store`, handling the
/// recursive-scan root bookkeeping (`set_current_root` / pruning) the
/// caller would otherwise have to reproduce, and resolving `path` to an
/// absolute form first (see `absolutize`) before it ever reaches the
/// `Store`. Does not save the store — callers owning their own `Store`
/// lifecycle call `Store::save` themselves.
pub fn measure_directory_with_store(
    path: &Path,
    recursive: bool,
    bypass_cache: bool,
    recalculate: bool,
    store: &mut Store,
) -> u64 {
    let mut source = OsEntropySource::new();
    measure_directory_with_store_and_source(path, recursive, bypass_cache, recalculate, store, &mut source)
}

/// Full-control entry point taking an explicit [`StabilitySource`], for
/// deterministic tests and any caller that wants reproducible decisions.
pub fn measure_directory_with_store_and_source(
    path: &Path,
    recursive: bool,
    bypass_cache: bool,
    recalculate: bool,
    store: &mut Store,
    source: &mut dyn StabilitySource,
) -> u64 {
    let Some(path) = absolutize_or_log(path) else {
        return 0;
    };
    let path = path.as_path();

    if recursive && !bypass_cache {
        store.set_current_root(path);
    }

    let total = measure::measure(path, recursive, bypass_cache, recalculate, store, source);

    if recursive && !bypass_cache {
        store.prune_unvisited_under_root();
    }

    total
}
