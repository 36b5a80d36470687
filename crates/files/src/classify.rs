use crate::path::NotebookPath;
use std::path::Path;

/// Marker required in a markdown notebook's front matter.
pub const MARKDOWN_VERSION_MARKER: &str = "quill-version:";

/// Marker of the app declaration in a Python notebook.
pub const APP_DECLARATION_MARKER: &str = "quill.App";

/// Marker of the framework import in a Python notebook.
pub const FRAMEWORK_IMPORT_MARKER: &str = "import quill";

/// What a filesystem path holds, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Notebook,
    Directory,
    Invalid,
}

/// Classify a path by extension and content.
///
/// Classification is advisory: any read failure degrades to `Invalid`
/// rather than surfacing an error to the caller.
pub fn classify(path: &Path) -> PathKind {
    if path.is_dir() {
        return PathKind::Directory;
    }
    if !path.is_file() {
        return PathKind::Invalid;
    }

    let Ok(notebook) = NotebookPath::new(path) else {
        return PathKind::Invalid;
    };
    let contents = match notebook.read_text() {
        Ok(contents) => contents,
        Err(err) => {
            log::debug!("Error reading file {}: {err}", path.display());
            return PathKind::Invalid;
        }
    };

    if notebook.is_markdown() && contents.contains(MARKDOWN_VERSION_MARKER) {
        return PathKind::Notebook;
    }
    if notebook.is_python()
        && contents.contains(APP_DECLARATION_MARKER)
        && contents.contains(FRAMEWORK_IMPORT_MARKER)
    {
        return PathKind::Notebook;
    }
    PathKind::Invalid
}

#[must_use]
pub fn is_notebook(path: &Path) -> bool {
    classify(path) == PathKind::Notebook
}

#[cfg(test)]
mod tests {
    use super::{classify, is_notebook, PathKind};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn python_file_with_both_markers_is_a_notebook() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("app.py");
        fs::write(&file, "import quill\n\napp = quill.App()\n").unwrap();

        assert_eq!(classify(&file), PathKind::Notebook);
    }

    #[test]
    fn python_file_missing_a_marker_is_not_a_notebook() {
        let temp = tempdir().unwrap();
        let import_only = temp.path().join("lib.py");
        fs::write(&import_only, "import quill\n").unwrap();
        let app_only = temp.path().join("other.py");
        fs::write(&app_only, "app = quill.App()\n").unwrap();

        assert_eq!(classify(&import_only), PathKind::Invalid);
        assert_eq!(classify(&app_only), PathKind::Invalid);
    }

    #[test]
    fn markdown_file_with_version_marker_is_a_notebook() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("doc.md");
        fs::write(&file, "---\nquill-version: 0.1.0\n---\n# Title\n").unwrap();

        assert_eq!(classify(&file), PathKind::Notebook);
    }

    #[test]
    fn directories_classify_as_directory_regardless_of_content() {
        let temp = tempdir().unwrap();
        assert_eq!(classify(temp.path()), PathKind::Directory);
    }

    #[test]
    fn missing_or_unreadable_paths_are_invalid() {
        let temp = tempdir().unwrap();
        assert_eq!(classify(&temp.path().join("gone.py")), PathKind::Invalid);

        let binary = temp.path().join("data.py");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        assert!(!is_notebook(&binary));
    }

    #[test]
    fn wrong_extension_is_invalid_even_with_markers() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "import quill\napp = quill.App()\n").unwrap();

        assert_eq!(classify(&file), PathKind::Invalid);
    }
}
