use chrono::{DateTime, Utc};

/// Current on-disk cache format version. Stamped once in the file header;
/// every `CacheEntry` loaded from a given file implicitly carries this
/// version (there is no per-record version field on the wire).
pub const CACHE_FORMAT_VERSION: i32 = 2;

pub const MIN_CHECK_RATE: f64 = 0.01;
pub const MAX_CHECK_RATE: f64 = 1.0;
pub const DEFAULT_CHECK_RATE: f64 = 0.2;

/// Per-directory cache record.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub own_size_bytes: u64,
    pub total_size_bytes: u64,
    /// The directory's own last-write time as of the scan that produced
    /// this entry. `DateTime::<Utc>::MIN_UTC` means "no LWT known".
    pub directory_lwt_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub check_rate: f64,
    /// Set during the current invocation when the engine reaches this
    /// entry. Never serialized; always `false` immediately after load.
    pub visited: bool,
}

impl CacheEntry {
    pub fn new(
        own_size_bytes: u64,
        total_size_bytes: u64,
        directory_lwt_utc: DateTime<Utc>,
        updated_utc: DateTime<Utc>,
        check_rate: f64,
    ) -> Self {
        CacheEntry {
            own_size_bytes,
            total_size_bytes,
            directory_lwt_utc,
            updated_utc,
            check_rate: clamp_check_rate(check_rate),
            visited: false,
        }
    }

    /// `true` iff there is a known last-write time for this entry (i.e. it
    /// is not the "no LWT known" sentinel).
    pub fn has_known_lwt(&self) -> bool {
        self.directory_lwt_utc != DateTime::<Utc>::MIN_UTC
    }
}

pub fn clamp_check_rate(rate: f64) -> f64 {
    rate.clamp(MIN_CHECK_RATE, MAX_CHECK_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_check_rate() {
        let e = CacheEntry::new(0, 0, DateTime::<Utc>::MIN_UTC, Utc::now(), 5.0);
        assert_eq!(e.check_rate, MAX_CHECK_RATE);

        let e = CacheEntry::new(0, 0, DateTime::<Utc>::MIN_UTC, Utc::now(), -1.0);
        assert_eq!(e.check_rate, MIN_CHECK_RATE);
    }

    #[test]
    fn sentinel_lwt_reports_unknown() {
        let e = CacheEntry::new(0, 0, DateTime::<Utc>::MIN_UTC, Utc::now(), 0.2);
        assert!(!e.has_known_lwt());
    }
}
