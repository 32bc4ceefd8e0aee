//! Directory snapshots and change classification.
//!
//! A snapshot maps every regular file under the watched root (keyed by its
//! `/`-separated path relative to the root) to its full text content. The
//! filesystem itself is reached through [`FileSource`] so the engine can be
//! driven by a real directory or an in-memory tree.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::event::ChangeKind;

/// Filesystem collaborator used to build snapshots.
pub trait FileSource: Send + Sync {
    /// Relative paths of every regular file under the root.
    fn list_files(&self) -> Vec<String>;

    /// Full content of `path`, or an empty string if it cannot be read.
    fn read_to_string(&self, path: &str) -> String;
}

impl<T: FileSource + ?Sized> FileSource for Arc<T> {
    fn list_files(&self) -> Vec<String> {
        (**self).list_files()
    }

    fn read_to_string(&self, path: &str) -> String {
        (**self).read_to_string(path)
    }
}

/// Reads a real directory tree.
///
/// Keys are decoded lossily, so each listing also records the on-disk path
/// behind every key. Reads go through that path, which keeps files whose
/// names are not valid UTF-8 readable.
#[derive(Debug)]
pub struct LocalFileSource {
    root: PathBuf,
    // Key -> path relative to root, from the latest listing.
    listed: RwLock<HashMap<String, PathBuf>>,
}

impl LocalFileSource {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            listed: RwLock::new(HashMap::new()),
        }
    }

    /// Directory being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for LocalFileSource {
    fn list_files(&self) -> Vec<String> {
        let mut listed = HashMap::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !key.is_empty() {
                listed.insert(key, relative.to_path_buf());
            }
        }

        let files = listed.keys().cloned().collect();
        *self.listed.write().unwrap_or_else(PoisonError::into_inner) = listed;
        files
    }

    fn read_to_string(&self, path: &str) -> String {
        let full = match self
            .listed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            Some(relative) => self.root.join(relative),
            None => self.root.join(path),
        };
        match std::fs::read(&full) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                debug!(path, error = %err, "read failed, recording empty content");
                String::new()
            }
        }
    }
}

/// In-memory file tree, mutable through `&self`.
#[derive(Debug, Default)]
pub struct MemoryFileSource {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryFileSource {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a source from `(path, content)` pairs.
    pub fn with_files<I, K, V>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            files: RwLock::new(files),
        }
    }

    /// Creates or overwrites a file.
    pub fn write(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), content.into());
    }

    /// Removes a file. Returns true if it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }
}

impl FileSource for MemoryFileSource {
    fn list_files(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn read_to_string(&self, path: &str) -> String {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

/// One classified difference between two snapshots.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub kind: ChangeKind,
}

/// Mapping from relative path to full content at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, String>,
}

impl Snapshot {
    /// Reads every file listed by `source`.
    pub fn capture(source: &dyn FileSource) -> Self {
        let files = source
            .list_files()
            .into_iter()
            .map(|path| {
                let content = source.read_to_string(&path);
                (path, content)
            })
            .collect();
        Self { files }
    }

    /// Content recorded for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Classifies how `current` differs from `previous`.
    ///
    /// Created and modified files come first, in path order, followed by
    /// deleted files in path order. Each changed path appears exactly once.
    #[must_use]
    pub fn changes(previous: &Self, current: &Self) -> Vec<Change> {
        let mut out = Vec::new();

        for (path, content) in &current.files {
            let kind = match previous.files.get(path) {
                None => ChangeKind::Created,
                Some(prev) if prev != content => ChangeKind::Modified,
                Some(_) => continue,
            };
            out.push(Change {
                path: path.clone(),
                kind,
            });
        }

        out.extend(
            previous
                .files
                .keys()
                .filter(|path| !current.files.contains_key(*path))
                .map(|path| Change {
                    path: path.clone(),
                    kind: ChangeKind::Deleted,
                }),
        );

        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
