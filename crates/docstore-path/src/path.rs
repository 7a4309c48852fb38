use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Separator used when a path is built from, or printed as, a single string.
pub const SEPARATOR: char = '.';

/// A single key in a [`Path`].
///
/// Mapping keys are stored verbatim, sequence positions as decimal strings.
pub type PathStep = String;

/// An ordered sequence of keys locating a value inside a tree.
///
/// Paths never contain empty steps: every constructor drops them. Paths are
/// not mutated in place; [`slice`](Path::slice), [`parent`](Path::parent)
/// and [`concat`](Path::concat) return new values.
#[derive(Debug, Clone, Default)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// Builds a path from any number of parts, flattening them in order.
    ///
    /// Each part converts through `Into<Path>`: strings are split on
    /// [`SEPARATOR`], indices become a single step, vectors and other paths
    /// are flattened and `None` contributes nothing.
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        let mut steps = Vec::new();
        for part in parts {
            steps.extend(part.into().steps);
        }
        Self { steps }
    }

    /// The empty path, addressing the root of a tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Splits `s` on [`SEPARATOR`].
    pub fn parse(s: &str) -> Self {
        Self::from_steps(s.split(SEPARATOR))
    }

    /// Builds a path from raw keys without splitting them.
    ///
    /// Use this when keys may themselves contain the separator.
    pub fn from_steps<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathStep>,
    {
        Self {
            steps: steps
                .into_iter()
                .map(Into::into)
                .filter(|step: &PathStep| !step.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathStep> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// Last key, or `None` for the root path.
    pub fn leaf(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// All but the last key. The parent of the root is the root.
    pub fn parent(&self) -> Path {
        let end = self.steps.len().saturating_sub(1);
        self.slice(..end)
    }

    /// Sub-range of keys. Bounds past the end are clamped.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Path {
        let len = self.steps.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Path::root();
        }
        Self {
            steps: self.steps[start..end].to_vec(),
        }
    }

    /// This path followed by `other`.
    pub fn concat(&self, other: impl Into<Path>) -> Path {
        let mut steps = self.steps.clone();
        steps.extend(other.into().steps);
        Self { steps }
    }

    /// This path extended by a single raw key. The key is not split.
    pub fn child(&self, key: impl Into<PathStep>) -> Path {
        let mut steps = self.steps.clone();
        let key = key.into();
        if !key.is_empty() {
            steps.push(key);
        }
        Self { steps }
    }

    /// Same as `==`: true when both paths print identically.
    pub fn equals(&self, other: &Path) -> bool {
        self == other
    }

    /// True when `prefix` is a leading run of this path's keys.
    ///
    /// Every path is a sub-path of itself and of the root.
    pub fn is_sub_path_of(&self, prefix: &Path) -> bool {
        self.steps.len() >= prefix.steps.len()
            && self.steps[..prefix.steps.len()] == prefix.steps[..]
    }

    /// The keys left after removing `prefix`, if this path starts with it.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if !self.is_sub_path_of(prefix) {
            return None;
        }
        Some(self.slice(prefix.len()..))
    }

    /// Keys joined with [`SEPARATOR`].
    pub fn joined(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(step);
        }
        out
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.joined() == other.joined()
    }
}

impl Eq for Path {}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathStep;
    type IntoIter = std::slice::Iter<'a, PathStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::parse(s)
    }
}

impl From<usize> for Path {
    fn from(index: usize) -> Self {
        Self {
            steps: vec![index.to_string()],
        }
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl From<Vec<String>> for Path {
    fn from(parts: Vec<String>) -> Self {
        Path::new(parts)
    }
}

impl From<&[&str]> for Path {
    fn from(parts: &[&str]) -> Self {
        Path::new(parts.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(parts: [&str; N]) -> Self {
        Path::new(parts)
    }
}

impl<T: Into<Path>> From<Option<T>> for Path {
    fn from(part: Option<T>) -> Self {
        part.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flattens_parts() {
        let path = Path::new(vec![
            Path::from("a.b"),
            Path::from(3usize),
            Path::from(["c", "d.e"]),
            Path::from(None::<&str>),
        ]);
        assert_eq!(path.as_slice(), ["a", "b", "3", "c", "d", "e"]);
    }

    #[test]
    fn test_empty_segments_dropped() {
        assert_eq!(Path::parse("..a...b.").as_slice(), ["a", "b"]);
        assert!(Path::parse("").is_empty());
        assert!(Path::from_steps(["", ""]).is_empty());
    }

    #[test]
    fn test_leaf_and_parent() {
        let path = Path::parse("a.b.c");
        assert_eq!(path.leaf(), Some("c"));
        assert_eq!(path.parent(), Path::parse("a.b"));
        assert_eq!(Path::root().leaf(), None);
        assert!(Path::root().parent().is_empty());
    }

    #[test]
    fn test_slice_clamps() {
        let path = Path::parse("a.b.c");
        assert_eq!(path.slice(1..), Path::parse("b.c"));
        assert_eq!(path.slice(..=0), Path::parse("a"));
        assert_eq!(path.slice(2..10), Path::parse("c"));
        assert!(path.slice(5..).is_empty());
        assert!(path.slice(2..1).is_empty());
    }

    #[test]
    fn test_concat_and_child() {
        let base = Path::parse("a");
        assert_eq!(base.concat("b.c"), Path::parse("a.b.c"));
        assert_eq!(base.child("x.y").len(), 2);
        assert_eq!(base.child("").len(), 1);
        // the original is untouched
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_equality_uses_joined_form() {
        assert_eq!(Path::from_steps(["a.b"]), Path::parse("a.b"));
        assert_ne!(Path::parse("a.b"), Path::parse("a.c"));
        assert!(Path::parse("x").equals(&Path::from(["x"])));
    }

    #[test]
    fn test_is_sub_path_of() {
        let p = Path::parse("a.b.c");
        assert!(p.is_sub_path_of(&Path::parse("a.b")));
        assert!(p.is_sub_path_of(&p));
        assert!(p.is_sub_path_of(&Path::root()));
        assert!(!p.is_sub_path_of(&Path::parse("a.x")));
        assert!(!Path::parse("a").is_sub_path_of(&p));
    }

    #[test]
    fn test_strip_prefix() {
        let p = Path::parse("a.b.c");
        assert_eq!(p.strip_prefix(&Path::parse("a")), Some(Path::parse("b.c")));
        assert_eq!(p.strip_prefix(&p), Some(Path::root()));
        assert_eq!(p.strip_prefix(&Path::parse("b")), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Path::new(["a", "0"]).to_string(), "a.0");
        assert_eq!(Path::root().to_string(), "");
    }
}
