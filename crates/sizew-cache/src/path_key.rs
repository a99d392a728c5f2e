use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// A normalized, case-insensitively-compared absolute directory path.
///
/// The original-case path string is preserved (for display and for
/// re-deriving child paths); only the `Hash`/`Eq` comparison key folds
/// ASCII case, so the cache stays compatible across case-sensitive and
/// case-insensitive filesystems.
#[derive(Debug, Clone)]
pub struct NormalizedPath {
    display: String,
}

impl NormalizedPath {
    /// Builds a normalized key from an absolute path, stripping trailing
    /// separators. Returns `None` if `path` is not absolute.
    pub fn new(path: &Path) -> Option<Self> {
        if !path.is_absolute() {
            return None;
        }

        let mut display = path.to_string_lossy().into_owned();
        while display.len() > 1 && (display.ends_with('/') || display.ends_with('\\')) {
            display.pop();
        }

        Some(NormalizedPath { display })
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.display)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.display)
    }

    pub fn display_string(&self) -> &str {
        &self.display
    }

    fn compare_key(&self) -> String {
        self.display.to_ascii_lowercase()
    }
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.compare_key() == other.compare_key()
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.compare_key().hash(state)
    }
}

/// True iff `candidate` is `root` itself or a path-component-wise descendant
/// of it. Never a plain string-prefix test: `/foo/barbaz` is not a
/// descendant of `/foo/bar`.
pub fn is_descendant_of(candidate: &Path, root: &Path) -> bool {
    let root_components: Vec<Component> = root.components().collect();
    let candidate_components: Vec<Component> = candidate.components().collect();

    if candidate_components.len() < root_components.len() {
        return false;
    }

    root_components
        .iter()
        .zip(candidate_components.iter())
        .all(|(r, c)| components_eq(*r, *c))
}

fn components_eq(a: Component, b: Component) -> bool {
    match (a, b) {
        (Component::Normal(a), Component::Normal(b)) => {
            a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
        }
        _ => a == b,
    }
}
