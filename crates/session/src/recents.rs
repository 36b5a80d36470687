use quill_files::NotebookFile;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const MAX_RECENT_FILES: usize = 10;

/// Most-recently-used register of notebook paths. Holds paths only, never
/// file handles.
#[derive(Debug)]
pub struct RecentFiles {
    entries: VecDeque<PathBuf>,
    capacity: usize,
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::with_capacity(MAX_RECENT_FILES)
    }
}

impl RecentFiles {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Insert a path, or move an existing one to the front.
    pub fn touch(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.entries.retain(|entry| entry != &path);
        self.entries.push_front(path);
        self.entries.truncate(self.capacity);
    }

    /// Replace a renamed path with its new name.
    pub fn rename(&mut self, old: impl AsRef<Path>, new: impl AsRef<Path>) {
        self.remove(old.as_ref());
        self.touch(new);
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.entries.retain(|entry| entry != path);
    }

    #[must_use]
    pub fn list(&self) -> Vec<NotebookFile> {
        self.entries
            .iter()
            .map(|path| NotebookFile::from_path(path))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
