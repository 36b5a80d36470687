use crate::classify::APP_DECLARATION_MARKER;
use crate::error::{FilesError, Result};
use crate::path::NotebookPath;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments of the notebook's app declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_title: Option<String>,
}

impl AppConfig {
    fn render_arguments(&self) -> String {
        let mut args = Vec::new();
        if let Some(width) = &self.width {
            args.push(format!("width=\"{width}\""));
        }
        if let Some(title) = &self.app_title {
            args.push(format!("app_title=\"{title}\""));
        }
        args.join(", ")
    }
}

/// The file handle a session owns: zero-or-one backing path, where `None`
/// means an unsaved new notebook. Created by the resolver, destroyed with
/// the owning session; never shared across sessions.
#[derive(Debug)]
pub struct FileManager {
    path: Option<PathBuf>,
}

impl FileManager {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_unsaved(&self) -> bool {
        self.path.is_none()
    }

    pub fn read(&self) -> Result<String> {
        let path = self.require_path()?;
        Ok(fs::read_to_string(path)?)
    }

    /// Write the full notebook source to the backing path and return it.
    pub fn save(&self, contents: &str) -> Result<String> {
        let path = self.require_path()?;
        fs::write(path, contents)?;
        log::debug!("Saved notebook to {}", path.display());
        Ok(contents.to_string())
    }

    /// Move the backing file to `new_path` and rebind the handle.
    ///
    /// An unsaved manager gains its first backing file here. Refuses to
    /// clobber an existing file.
    pub fn rename(&mut self, new_path: impl AsRef<Path>) -> Result<()> {
        let target = NotebookPath::new(new_path.as_ref())?;
        if target.path().exists() {
            return Err(FilesError::InvalidPath(format!(
                "File {} already exists",
                target.path().display()
            )));
        }
        if let Some(parent) = target.path().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match &self.path {
            Some(old) => fs::rename(old, target.path())?,
            None => fs::write(target.path(), "")?,
        }
        log::info!("Renamed notebook to {}", target.path().display());
        self.path = Some(target.into_path_buf());
        Ok(())
    }

    /// Copy the backing file to `destination` and return its contents.
    pub fn copy_to(&self, destination: impl AsRef<Path>) -> Result<String> {
        let source = self.require_path()?;
        let target = NotebookPath::new(destination.as_ref())?;
        if let Some(parent) = target.path().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(source, target.path())?;
        Ok(fs::read_to_string(target.path())?)
    }

    /// Rewrite the app declaration line with `config`'s arguments and return
    /// the new contents. Files without a declaration are left untouched.
    pub fn save_app_config(&self, config: &AppConfig) -> Result<String> {
        let path = self.require_path()?;
        let contents = fs::read_to_string(path)?;
        let declaration = format!("app = quill.App({})", config.render_arguments());

        let mut replaced = false;
        let mut lines: Vec<String> = Vec::new();
        for line in contents.lines() {
            if !replaced && line.contains(APP_DECLARATION_MARKER) {
                lines.push(declaration.clone());
                replaced = true;
            } else {
                lines.push(line.to_string());
            }
        }
        if !replaced {
            log::debug!("No app declaration in {}", path.display());
            return Ok(contents);
        }

        let mut updated = lines.join("\n");
        if contents.ends_with('\n') {
            updated.push('\n');
        }
        fs::write(path, &updated)?;
        Ok(updated)
    }

    fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            FilesError::InvalidPath("notebook has no backing file; rename it first".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, FileManager};
    use crate::error::FilesError;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const NOTEBOOK: &str = "import quill\n\napp = quill.App(width=\"normal\")\n\nx = 1\n";

    #[test]
    fn unsaved_manager_has_no_path_and_refuses_reads() {
        let manager = FileManager::new(None);
        assert!(manager.is_unsaved());
        assert!(matches!(manager.read(), Err(FilesError::InvalidPath(_))));
    }

    #[test]
    fn save_writes_and_returns_the_contents() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, "").unwrap();

        let manager = FileManager::new(Some(file.clone()));
        let returned = manager.save(NOTEBOOK).unwrap();

        assert_eq!(returned, NOTEBOOK);
        assert_eq!(fs::read_to_string(&file).unwrap(), NOTEBOOK);
    }

    #[test]
    fn rename_moves_the_backing_file_and_rebinds() {
        let temp = tempdir().unwrap();
        let old = temp.path().join("old.py");
        fs::write(&old, NOTEBOOK).unwrap();
        let new = temp.path().join("sub/new.py");

        let mut manager = FileManager::new(Some(old.clone()));
        manager.rename(&new).unwrap();

        assert!(!old.exists());
        assert_eq!(manager.path().unwrap(), new.as_path());
        assert_eq!(fs::read_to_string(&new).unwrap(), NOTEBOOK);
    }

    #[test]
    fn rename_refuses_to_clobber() {
        let temp = tempdir().unwrap();
        let old = temp.path().join("old.py");
        let other = temp.path().join("other.py");
        fs::write(&old, NOTEBOOK).unwrap();
        fs::write(&other, "taken").unwrap();

        let mut manager = FileManager::new(Some(old.clone()));
        let result = manager.rename(&other);

        assert!(matches!(result, Err(FilesError::InvalidPath(_))));
        assert!(old.exists());
        assert_eq!(manager.path().unwrap(), old.as_path());
    }

    #[test]
    fn rename_gives_an_unsaved_manager_its_first_file() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("fresh.py");

        let mut manager = FileManager::new(None);
        manager.rename(&target).unwrap();

        assert!(target.exists());
        assert!(!manager.is_unsaved());
    }

    #[test]
    fn rename_validates_the_target_extension() {
        let mut manager = FileManager::new(None);
        assert!(matches!(
            manager.rename("notes.txt"),
            Err(FilesError::InvalidPath(_))
        ));
    }

    #[test]
    fn copy_preserves_the_source() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("nb.py");
        fs::write(&source, NOTEBOOK).unwrap();
        let destination = temp.path().join("nb_copy.py");

        let manager = FileManager::new(Some(source.clone()));
        let contents = manager.copy_to(&destination).unwrap();

        assert_eq!(contents, NOTEBOOK);
        assert!(source.exists());
        assert!(destination.exists());
    }

    #[test]
    fn save_app_config_rewrites_only_the_declaration_line() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, NOTEBOOK).unwrap();

        let manager = FileManager::new(Some(file.clone()));
        let config = AppConfig {
            width: Some("full".to_string()),
            app_title: Some("Demo".to_string()),
        };
        let updated = manager.save_app_config(&config).unwrap();

        assert_eq!(
            updated,
            "import quill\n\napp = quill.App(width=\"full\", app_title=\"Demo\")\n\nx = 1\n"
        );
    }

    #[test]
    fn save_app_config_leaves_declarationless_files_alone() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, "x = 1\n").unwrap();

        let manager = FileManager::new(Some(file.clone()));
        let contents = manager.save_app_config(&AppConfig::default()).unwrap();

        assert_eq!(contents, "x = 1\n");
        assert_eq!(fs::read_to_string(&file).unwrap(), "x = 1\n");
    }
}
