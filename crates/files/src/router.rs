use crate::error::{FilesError, Result};
use crate::manager::FileManager;
use crate::models::{FileInfo, NotebookFile};
use crate::path::NotebookPath;
use crate::remote::RemoteSources;
use crate::resolver::{self, ImportParams, NEW_FILE_KEY};
use crate::scanner::WorkspaceScanner;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Routes an abstract file key/selection to concrete notebook resources.
///
/// All variants share one capability set: a unique key (when the routing
/// names exactly one resource), a single file (ditto), and the recursive
/// file listing.
pub enum FileRouter {
    /// An ephemeral, unsaved notebook.
    NewFile,
    /// A caller-supplied explicit list; single-file routing wraps one entry.
    Files(Vec<NotebookFile>),
    /// A workspace directory, scanned lazily.
    Directory(DirectoryRouter),
}

impl FileRouter {
    /// Dispatch on a filesystem stat: regular files route as a single file,
    /// directories as a workspace.
    pub fn infer(path: &str) -> Result<Self> {
        let candidate = Path::new(path);
        if candidate.is_file() {
            log::debug!("Routing to file {path}");
            return Ok(Self::from_filename(&NotebookPath::new(candidate)?));
        }
        if candidate.is_dir() {
            log::debug!("Routing to directory {path}");
            return Ok(Self::from_directory(candidate));
        }
        Err(FilesError::InvalidPath(path.to_string()))
    }

    #[must_use]
    pub fn from_filename(file: &NotebookPath) -> Self {
        Self::Files(vec![NotebookFile {
            name: file.relative_name(),
            path: file.absolute_name(),
            last_modified: file.last_modified(),
        }])
    }

    #[must_use]
    pub fn from_directory(directory: impl AsRef<Path>) -> Self {
        Self::Directory(DirectoryRouter::new(directory, false))
    }

    #[must_use]
    pub fn from_files(files: Vec<NotebookFile>) -> Self {
        Self::Files(files)
    }

    #[must_use]
    pub fn new_file() -> Self {
        Self::NewFile
    }

    /// The one key this router names, if any.
    #[must_use]
    pub fn unique_key(&self) -> Option<String> {
        match self {
            Self::NewFile => Some(NEW_FILE_KEY.to_string()),
            Self::Files(files) if files.len() == 1 => Some(files[0].path.clone()),
            Self::Files(_) | Self::Directory(_) => None,
        }
    }

    /// The one file this router names, if any.
    #[must_use]
    pub fn single_file(&self) -> Option<&NotebookFile> {
        match self {
            Self::Files(files) if files.len() == 1 => files.first(),
            _ => None,
        }
    }

    /// All files under this router, as a recursive tree.
    pub fn files(&self) -> Result<Vec<FileInfo>> {
        match self {
            Self::NewFile => Ok(Vec::new()),
            Self::Files(files) => Ok(files.iter().map(FileInfo::from).collect()),
            Self::Directory(directory) => directory.files(),
        }
    }

    /// The backing directory, when routed to one.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Directory(directory) => Some(directory.directory()),
            _ => None,
        }
    }

    pub fn file_manager(
        &self,
        key: &str,
        params: &ImportParams,
        remote: &RemoteSources,
    ) -> Result<FileManager> {
        resolver::resolve(key, params, remote)
    }

    /// Resolve the router's unique key; errors when the routing is not
    /// single-file.
    pub fn single_file_manager(&self, remote: &RemoteSources) -> Result<FileManager> {
        let key = self
            .unique_key()
            .ok_or_else(|| FilesError::InvalidPath("expected a single file".to_string()))?;
        resolver::resolve(&key, &ImportParams::default(), remote)
    }

    /// Invalidate the memoized directory listing, if any.
    pub fn mark_stale(&self) {
        if let Self::Directory(directory) = self {
            directory.mark_stale();
        }
    }

    /// Change markdown inclusion for directory routing. A changed flag needs
    /// a fresh scanner (the allowed-extension set changed); an unchanged one
    /// keeps the instance and its cache.
    #[must_use]
    pub fn toggle_markdown(self, include_markdown: bool) -> Self {
        match self {
            Self::Directory(directory) => {
                Self::Directory(directory.toggle_markdown(include_markdown))
            }
            other => other,
        }
    }
}

/// A directory-backed router: canonicalized-ish root, markdown flag, and a
/// lazily computed listing that is invalidated wholesale, never patched.
pub struct DirectoryRouter {
    directory: PathBuf,
    include_markdown: bool,
    cache: Mutex<Option<Vec<FileInfo>>>,
}

impl DirectoryRouter {
    pub fn new(directory: impl AsRef<Path>, include_markdown: bool) -> Self {
        // Normalizing through components strips trailing separators.
        let directory: PathBuf = directory.as_ref().components().collect();
        Self {
            directory,
            include_markdown,
            cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub const fn include_markdown(&self) -> bool {
        self.include_markdown
    }

    #[must_use]
    pub fn toggle_markdown(self, include_markdown: bool) -> Self {
        if include_markdown != self.include_markdown {
            return Self::new(self.directory, include_markdown);
        }
        self
    }

    pub fn mark_stale(&self) {
        *self.lock_cache() = None;
    }

    pub fn files(&self) -> Result<Vec<FileInfo>> {
        let mut guard = self.lock_cache();
        if let Some(cached) = guard.as_ref() {
            return Ok(cached.clone());
        }
        let scanned = WorkspaceScanner::new(&self.directory, self.include_markdown).scan()?;
        *guard = Some(scanned.clone());
        Ok(scanned)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<Vec<FileInfo>>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
