use crate::error::{FilesError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A validated path to a notebook source file.
///
/// Only Python and markdown files can back a notebook; every other extension
/// is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPath {
    path: PathBuf,
}

impl NotebookPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let candidate = Self { path };
        if !candidate.is_python() && !candidate.is_markdown() {
            return Err(FilesError::InvalidPath(
                candidate.path.display().to_string(),
            ));
        }
        Ok(candidate)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    #[must_use]
    pub fn is_python(&self) -> bool {
        extension_matches(&self.path, &["py"])
    }

    #[must_use]
    pub fn is_markdown(&self) -> bool {
        extension_matches(&self.path, &["md", "markdown"])
    }

    pub fn read_text(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }

    /// File name component, for display.
    #[must_use]
    pub fn relative_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Full path string, canonicalized when the file exists.
    #[must_use]
    pub fn absolute_name(&self) -> String {
        self.path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone())
            .display()
            .to_string()
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<f64> {
        fs::metadata(&self.path)
            .ok()
            .and_then(|meta| mtime_seconds(&meta))
    }
}

fn extension_matches(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// Modification time as fractional unix seconds, when the platform exposes it.
pub(crate) fn mtime_seconds(meta: &fs::Metadata) -> Option<f64> {
    let modified = meta.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since_epoch.as_secs_f64())
}
