pub mod codec;
pub mod entry;
pub mod path_key;
pub mod store;
pub mod ticks;

pub use entry::{CacheEntry, CACHE_FORMAT_VERSION, DEFAULT_CHECK_RATE, MAX_CHECK_RATE, MIN_CHECK_RATE};
pub use path_key::{is_descendant_of, NormalizedPath};
pub use store::{get_cache_path, get_cache_path_custom, Store};
