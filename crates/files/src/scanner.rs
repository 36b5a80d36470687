use crate::classify;
use crate::error::{FilesError, Result};
use crate::models::FileInfo;
use crate::natural_sort::natural_key;
use crate::path::mtime_seconds;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Scanner for the notebook files beneath a workspace directory.
///
/// The walk is bounded twice over: recursion stops past [`MAX_DEPTH`], and a
/// wall-clock deadline aborts the whole scan rather than returning a partial
/// (and therefore misleading) tree. Hidden entries and well-known
/// environment/dependency directories are invisible at every depth, and
/// directory branches with no qualifying descendant are pruned from the
/// result.
pub struct WorkspaceScanner {
    root: PathBuf,
    include_markdown: bool,
}

impl WorkspaceScanner {
    pub fn new(root: impl AsRef<Path>, include_markdown: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            include_markdown,
        }
    }

    /// Walk the root and return its pruned, naturally-ordered listing tree.
    pub fn scan(&self) -> Result<Vec<FileInfo>> {
        let deadline = Instant::now() + MAX_EXECUTION_TIME;
        self.recurse(&self.root, 0, deadline)
    }

    fn recurse(&self, directory: &Path, depth: usize, deadline: Instant) -> Result<Vec<FileInfo>> {
        if depth > MAX_DEPTH {
            return Ok(Vec::new());
        }
        // Deadline is polled cooperatively on entry to every directory; the
        // read_dir handle below closes on every exit path.
        if Instant::now() >= deadline {
            return Err(FilesError::ScanTimeout(
                "Loading workspace files took too long".to_string(),
            ));
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Error scanning directory {}: {err}", directory.display());
                return Ok(Vec::new());
            }
        };

        let mut folders: Vec<FileInfo> = Vec::new();
        let mut files: Vec<FileInfo> = Vec::new();

        for entry in entries {
            // Entries that vanish between listing and stat contribute nothing.
            let Ok(entry) = entry else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(HIDDEN_PREFIX) {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if SKIP_DIRS.iter().any(|skip| *skip == name) || depth == MAX_DEPTH {
                    continue;
                }
                let children = self.recurse(&entry.path(), depth + 1, deadline)?;
                if !children.is_empty() {
                    folders.push(FileInfo {
                        id: entry.path().display().to_string(),
                        name,
                        path: entry.path().display().to_string(),
                        last_modified: None,
                        is_directory: true,
                        is_notebook_file: false,
                        children,
                    });
                }
            } else if self.has_allowed_extension(&name) && classify::is_notebook(&entry.path()) {
                let last_modified = entry.metadata().ok().and_then(|meta| mtime_seconds(&meta));
                files.push(FileInfo {
                    id: entry.path().display().to_string(),
                    name,
                    path: entry.path().display().to_string(),
                    last_modified,
                    is_directory: false,
                    is_notebook_file: true,
                    children: Vec::new(),
                });
            }
        }

        // Directories before files, each group in natural order.
        folders.sort_by_key(|info| natural_key(&info.name));
        files.sort_by_key(|info| natural_key(&info.name));
        folders.append(&mut files);
        Ok(folders)
    }

    fn has_allowed_extension(&self, name: &str) -> bool {
        if name.ends_with(".py") {
            return true;
        }
        self.include_markdown && name.ends_with(".md")
    }
}

pub const MAX_DEPTH: usize = 5;
pub const MAX_EXECUTION_TIME: Duration = Duration::from_secs(5);

/// Environment/dependency directories never worth descending into.
pub const SKIP_DIRS: &[&str] = &[
    "env",
    "venv",
    "__pycache__",
    "node_modules",
    "site-packages",
    "eggs",
];

pub const HIDDEN_PREFIX: char = '.';
