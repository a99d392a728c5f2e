use std::path::Path;

use chrono::{DateTime, Utc};
use sizew_cache::{CacheEntry, Store, DEFAULT_CHECK_RATE};

use crate::stability::StabilitySource;

/// Slack accommodating clock skew and filesystem timestamp quantization
/// when comparing a directory's last-write time against the cached value.
pub const LWT_TOLERANCE_SECONDS: i64 = 5;

/// The recursive decision core. See `SPEC_FULL.md` §4.3 for the full
/// decision table this function implements; the row comments below match
/// it one-for-one.
pub fn measure(
    path: &Path,
    recursive: bool,
    bypass_cache: bool,
    recalculate: bool,
    store: &mut Store,
    source: &mut dyn StabilitySource,
) -> u64 {
    // Row 1: bypass_cache. Full recompute; never touch the Store.
    if bypass_cache {
        return measure_bypassing_cache(path, recursive);
    }

    // A directory that no longer exists contributes zero and leaves
    // whatever the Store already holds for it untouched — mutating or
    // creating an entry here would cache a lie about a path nothing backs.
    if !path.is_dir() {
        log::trace!("measure: {} does not exist, leaving cache entry (if any) untouched", path.display());
        return 0;
    }

    let existing = store.get(path).cloned();
    let l_now = sizew_probe::dir_lwt(path);

    // Row 2: recalculate. Full recompute, but still write back.
    if recalculate {
        return full_recompute(path, recursive, store, existing.as_ref(), l_now, source);
    }

    if let Some(entry) = &existing {
        // Row 3: LWT moved beyond tolerance. Full recompute, mark dirty.
        if let Some(l_now_value) = l_now {
            let diff_seconds = (l_now_value - entry.directory_lwt_utc).num_seconds().abs();
            if diff_seconds > LWT_TOLERANCE_SECONDS {
                store.mark_dirty();
                return full_recompute(path, recursive, store, existing.as_ref(), l_now, source);
            }
        }

        let check_rate = sizew_cache::entry::clamp_check_rate(entry.check_rate);
        let stable = source.next_f64() >= check_rate;

        if stable {
            // Row 4: deep-skip.
            if entry.total_size_bytes > 0 && recursive {
                log::trace!("deep-skip {}", path.display());
                store.mark_visited(path);
                return entry.total_size_bytes;
            }

            // Row 5: shallow-trust.
            if entry.total_size_bytes == 0 {
                log::trace!("shallow-trust {}", path.display());
                let own = entry.own_size_bytes;
                let children_total = recurse_children(path, recursive, store, source);
                store.mark_visited(path);
                return own.saturating_add(children_total);
            }
        }
    }

    // Row 6: otherwise. Full recompute of own files, then recurse.
    full_recompute(path, recursive, store, existing.as_ref(), l_now, source)
}

fn recurse_children(path: &Path, recursive: bool, store: &mut Store, source: &mut dyn StabilitySource) -> u64 {
    if !recursive {
        return 0;
    }

    sizew_probe::child_dirs(path)
        .iter()
        .map(|child| measure(child, recursive, false, false, store, source))
        .sum()
}

fn full_recompute(
    path: &Path,
    recursive: bool,
    store: &mut Store,
    existing: Option<&CacheEntry>,
    l_now: Option<DateTime<Utc>>,
    source: &mut dyn StabilitySource,
) -> u64 {
    log::trace!("recompute {}", path.display());
    let own = sizew_probe::own_files_size(path);
    let children_total = recurse_children(path, recursive, store, source);
    let total = own.saturating_add(children_total);

    let now = Utc::now();
    let directory_lwt = l_now.unwrap_or(now);
    let check_rate = adapt_check_rate(existing, own, total);
    log::debug!(
        "check_rate for {}: {:.4} -> {:.4}",
        path.display(),
        existing.map(|e| e.check_rate).unwrap_or(DEFAULT_CHECK_RATE),
        check_rate
    );
    store.insert_or_replace(path, CacheEntry::new(own, total, directory_lwt, now, check_rate));
    store.mark_visited(path);

    total
}

/// Full recompute that never reads or writes the Store, recursively, for
/// the entire `bypass_cache` subtree.
fn measure_bypassing_cache(path: &Path, recursive: bool) -> u64 {
    let own = sizew_probe::own_files_size(path);
    let children_total = if recursive {
        sizew_probe::child_dirs(path)
            .iter()
            .map(|child| measure_bypassing_cache(child, recursive))
            .sum()
    } else {
        0
    };
    own.saturating_add(children_total)
}

fn adapt_check_rate(existing: Option<&CacheEntry>, new_own: u64, new_total: u64) -> f64 {
    let current_rate = existing.map(|e| e.check_rate).unwrap_or(DEFAULT_CHECK_RATE);

    let grew = match existing {
        None => true,
        Some(e) if e.own_size_bytes != new_own => true,
        Some(e) if e.total_size_bytes > 0 && e.total_size_bytes != new_total => true,
        Some(_) => false,
    };

    let adapted = if grew { current_rate * 1.5 } else { current_rate * 0.2 };
    sizew_cache::entry::clamp_check_rate(adapted)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sizew_cache::{MAX_CHECK_RATE, MIN_CHECK_RATE};

    use super::*;
    use crate::stability::{FixedSource, SequenceSource};

    fn write_file(path: &Path, contents: &[u8]) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn cold_scan_computes_totals_and_populates_store() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("t").join("a");
        let sub = root.join("b");
        fs::create_dir_all(&sub).unwrap();
        write_file(&root.join("x"), &[0u8; 100]);
        write_file(&root.join("y"), &[0u8; 50]);
        write_file(&sub.join("z"), &[0u8; 200]);

        let mut store = Store::empty();
        let mut source = FixedSource(0.99); // always "unstable" is irrelevant: no cache yet
        let total = measure(&root, true, false, false, &mut store, &mut source);

        assert_eq!(total, 350);
        let root_entry = store.get(&root).unwrap();
        assert_eq!(root_entry.own_size_bytes, 150);
        assert_eq!(root_entry.total_size_bytes, 350);
        let sub_entry = store.get(&sub).unwrap();
        assert_eq!(sub_entry.own_size_bytes, 200);
        assert_eq!(sub_entry.total_size_bytes, 200);
    }

    #[test]
    fn warm_scan_with_low_r_deep_skips_without_reading_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("t").join("a");
        let sub = root.join("b");
        fs::create_dir_all(&sub).unwrap();
        write_file(&root.join("x"), &[0u8; 100]);
        write_file(&sub.join("z"), &[0u8; 200]);

        let mut store = Store::empty();
        let mut cold_source = FixedSource(0.0);
        let first_total = measure(&root, true, false, false, &mut store, &mut cold_source);
        assert_eq!(first_total, 300);

        // Second run: r = 0.0 is always < any check_rate in [0.01, 1.0],
        // so the stability test always fails here... use r close to 1
        // instead, which is >= any check_rate and passes the test.
        let mut warm_source = FixedSource(0.999);
        let second_total = measure(&root, true, false, false, &mut store, &mut warm_source);
        assert_eq!(second_total, first_total);

        // The child was not visited on the warm (deep-skip) run.
        assert!(!store.get(&sub).unwrap().visited);
    }

    #[test]
    fn mutation_below_parent_lwt_radar_is_caught_with_recalculate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("t").join("a");
        let sub = root.join("b");
        fs::create_dir_all(&sub).unwrap();
        write_file(&root.join("x"), &[0u8; 100]);
        write_file(&root.join("y"), &[0u8; 50]);
        write_file(&sub.join("z"), &[0u8; 200]);

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        let first_total = measure(&root, true, false, false, &mut store, &mut source);
        assert_eq!(first_total, 350);

        // Overwrite in place: same file count, parent directory LWT
        // untouched by this (same number of directory entries).
        write_file(&sub.join("z"), &[0u8; 201]);

        let second_total = measure(&root, true, false, true, &mut store, &mut source);
        assert_eq!(second_total, 351);
        assert_eq!(store.get(&sub).unwrap().own_size_bytes, 201);
        assert_eq!(store.get(&root).unwrap().total_size_bytes, 351);
    }

    #[test]
    fn check_rate_grows_on_change_and_shrinks_on_quiescence() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir_all(&root).unwrap();
        write_file(&root.join("a"), &[0u8; 10]);

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        measure(&root, true, false, false, &mut store, &mut source);
        let rate_after_first = store.get(&root).unwrap().check_rate;
        assert!((rate_after_first - DEFAULT_CHECK_RATE * 1.5).abs() < 1e-9);

        // Force recompute again via recalculate with no change: should shrink.
        measure(&root, true, false, true, &mut store, &mut source);
        let rate_after_second = store.get(&root).unwrap().check_rate;
        assert!(rate_after_second < rate_after_first);

        // Repeated quiescent recomputes approach the floor.
        for _ in 0..20 {
            measure(&root, true, false, true, &mut store, &mut source);
        }
        assert!((store.get(&root).unwrap().check_rate - MIN_CHECK_RATE).abs() < 1e-9);
    }

    #[test]
    fn check_rate_never_exceeds_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir_all(&root).unwrap();

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);

        for i in 0..10 {
            write_file(&root.join(format!("f{i}")), &[0u8; 5]);
            measure(&root, true, false, true, &mut store, &mut source);
            let rate = store.get(&root).unwrap().check_rate;
            assert!((MIN_CHECK_RATE..=MAX_CHECK_RATE).contains(&rate));
        }
    }

    #[test]
    fn empty_directory_has_zero_own_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty");
        fs::create_dir_all(&root).unwrap();

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        let total = measure(&root, true, false, false, &mut store, &mut source);

        assert_eq!(total, 0);
        let entry = store.get(&root).unwrap();
        assert_eq!(entry.own_size_bytes, 0);
        assert_eq!(entry.total_size_bytes, 0);
    }

    #[test]
    fn missing_directory_returns_zero_and_creates_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        let total = measure(&missing, true, false, false, &mut store, &mut source);

        assert_eq!(total, 0);
        assert!(store.get(&missing).is_none());
    }

    #[test]
    fn missing_directory_does_not_mutate_an_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        fs::create_dir_all(&gone).unwrap();
        write_file(&gone.join("a"), &[0u8; 42]);

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        measure(&gone, true, false, false, &mut store, &mut source);
        let cached_before = store.get(&gone).cloned().unwrap();
        assert_eq!(cached_before.own_size_bytes, 42);

        fs::remove_dir_all(&gone).unwrap();
        let total = measure(&gone, true, false, true, &mut store, &mut source);

        assert_eq!(total, 0);
        let cached_after = store.get(&gone).unwrap();
        assert_eq!(cached_after.own_size_bytes, cached_before.own_size_bytes);
        assert_eq!(cached_after.total_size_bytes, cached_before.total_size_bytes);
    }

    #[test]
    fn bypass_cache_never_touches_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir_all(&root).unwrap();
        write_file(&root.join("a"), &[0u8; 10]);

        let mut store = Store::empty();
        let mut source = FixedSource(0.5);
        let total = measure(&root, true, true, false, &mut store, &mut source);

        assert_eq!(total, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn shallow_trust_reuses_own_but_still_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir_all(&root).unwrap();
        write_file(&root.join("a"), &[0u8; 10]);

        let mut store = Store::empty();
        // First scan non-recursive: total_size_bytes stays 0 because the
        // child subdirectory is never visited to contribute to total.
        let mut source = FixedSource(0.5);
        measure(&root, false, false, false, &mut store, &mut source);
        assert_eq!(store.get(&root).unwrap().total_size_bytes, 0);

        // Add a child directory after the cache entry exists.
        let sub = root.join("sub");
        fs::create_dir_all(&sub).unwrap();
        write_file(&sub.join("z"), &[0u8; 40]);

        // Now scan recursively with a high r (stability test passes):
        // total_size_bytes == 0 triggers shallow-trust, which still
        // recurses into the newly created child.
        let mut warm_source = SequenceSource::new(vec![0.999]);
        let total = measure(&root, true, false, false, &mut store, &mut warm_source);
        assert_eq!(total, 10 + 40);
    }
}
