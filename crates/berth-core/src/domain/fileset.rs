//! Deployable file sets.
//!
//! A [`FileSet`] is the complete deployable artifact: an ordered sequence
//! of path/content pairs with unique paths. File sets are values — the
//! orchestrator never edits one in place, it derives a new set between
//! attempts via [`FileSet::revise`] and compares provenance with
//! [`FileSet::revision_digest`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One deployable file: an opaque text payload keyed by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFile {
    /// Path relative to the site root (no leading slash).
    pub path: String,
    /// Full file contents.
    pub content: String,
}

impl SiteFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_path(path.into()),
            content: content.into(),
        }
    }
}

fn normalize_path(path: String) -> String {
    match path.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Ordered, path-unique collection of [`SiteFile`]s.
///
/// Paths are unique within a set; inserting a path that already exists
/// replaces its content in place (last write wins) without changing its
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    files: Vec<SiteFile>,
}

impl FileSet {
    /// Empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from path/content pairs, deduplicating by path.
    pub fn from_files(files: impl IntoIterator<Item = SiteFile>) -> Self {
        let mut set = Self::new();
        for file in files {
            set.insert(file);
        }
        set
    }

    fn insert(&mut self, file: SiteFile) {
        let file = SiteFile::new(file.path, file.content);
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => existing.content = file.content,
            None => self.files.push(file),
        }
    }

    /// Derive a new set with `file` inserted (last write wins).
    pub fn with_file(&self, file: SiteFile) -> Self {
        let mut next = self.clone();
        next.insert(file);
        next
    }

    /// Derive a new set with every replacement applied.
    ///
    /// Replacements for existing paths overwrite content; replacements
    /// for new paths append in the order given.
    pub fn revise(&self, replacements: impl IntoIterator<Item = SiteFile>) -> Self {
        let mut next = self.clone();
        for file in replacements {
            next.insert(file);
        }
        next
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Look up a file's content by exact path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Whether any path satisfies `pred` (e.g. vendored-dependency markers).
    pub fn any_path(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.files.iter().any(|f| pred(&f.path))
    }

    /// Iterate files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteFile> {
        self.files.iter()
    }

    /// SHA-256 digest over all path/content pairs, in order.
    ///
    /// Two sets with identical files yield identical digests, so the
    /// orchestrator can tell whether a repair actually changed anything.
    pub fn revision_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.content.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<SiteFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = SiteFile>>(iter: I) -> Self {
        Self::from_files(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_path_last_write_wins() {
        let set = FileSet::from_files([
            SiteFile::new("index.html", "<h1>one</h1>"),
            SiteFile::new("style.css", "body {}"),
            SiteFile::new("index.html", "<h1>two</h1>"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("index.html"), Some("<h1>two</h1>"));
        // position of the replaced file is preserved
        assert_eq!(set.iter().next().unwrap().path, "index.html");
    }

    #[test]
    fn test_leading_slash_is_normalized() {
        let set = FileSet::from_files([SiteFile::new("/src/index.ts", "export {}")]);
        assert!(set.contains("src/index.ts"));
        assert!(!set.contains("/src/index.ts"));
    }

    #[test]
    fn test_revise_produces_new_value() {
        let original = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);
        let revised = original.revise([
            SiteFile::new("index.html", "<h1>Hello</h1>"),
            SiteFile::new("app.js", "console.log(1)"),
        ]);

        assert_eq!(original.len(), 1);
        assert_eq!(original.get("index.html"), Some("<h1>Hi</h1>"));
        assert_eq!(revised.len(), 2);
        assert_eq!(revised.get("index.html"), Some("<h1>Hello</h1>"));
    }

    #[test]
    fn test_revision_digest_tracks_content() {
        let a = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);
        let b = a.revise([SiteFile::new("index.html", "<h1>Hi!</h1>")]);
        let c = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);

        assert_ne!(a.revision_digest(), b.revision_digest());
        assert_eq!(a.revision_digest(), c.revision_digest());
    }

    #[test]
    fn test_empty_set_digest_is_stable() {
        assert_eq!(
            FileSet::new().revision_digest(),
            FileSet::new().revision_digest()
        );
    }
}
