use crate::path::mtime_seconds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A node in a workspace listing tree.
///
/// Leaves always have `is_directory == false`; directory nodes only appear
/// when at least one notebook-classified descendant survived pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<f64>,
    pub is_directory: bool,
    pub is_notebook_file: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileInfo>,
}

/// A flat notebook entry (recents, explicit lists, single files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookFile {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<f64>,
}

impl NotebookFile {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.display().to_string(),
            last_modified: fs::metadata(path).ok().and_then(|meta| mtime_seconds(&meta)),
        }
    }
}

impl From<&NotebookFile> for FileInfo {
    fn from(file: &NotebookFile) -> Self {
        Self {
            id: file.path.clone(),
            name: file.name.clone(),
            path: file.path.clone(),
            last_modified: file.last_modified,
            is_directory: false,
            is_notebook_file: true,
            children: Vec::new(),
        }
    }
}
