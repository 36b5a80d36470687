use crate::error::{FilesError, Result};
use crate::manager::FileManager;
use crate::remote::{ConvertError, RemoteSources};
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved key for a new, unsaved notebook.
pub const NEW_FILE_KEY: &str = "__new__";

/// Import metadata carried on the resolving request's query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportParams {
    pub file: Option<String>,
    pub notebook_id: Option<String>,
    pub user_id: Option<String>,
    pub imported: bool,
    pub template_id: Option<String>,
}

/// Resolve an opaque file key to a managed file handle.
///
/// Keys carrying the new-file sentinel resolve to an unbound handle and
/// never touch disk. Keys missing on disk go through the import flows when
/// the params name one, and otherwise materialize as an empty file. Two
/// concurrent resolutions of the same brand-new key may race to create it;
/// last writer wins.
pub fn resolve(key: &str, params: &ImportParams, remote: &RemoteSources) -> Result<FileManager> {
    if key.starts_with(NEW_FILE_KEY) {
        return Ok(FileManager::new(None));
    }

    let path = Path::new(key);
    if !path.exists() {
        if params.imported && params.notebook_id.is_some() {
            match import_notebook(path, params, remote) {
                Ok(local) => return Ok(FileManager::new(Some(local))),
                // The import mechanism itself is missing: fall through and
                // treat the key as an ordinary local path.
                Err(ImportError::Unavailable(reason)) => {
                    log::warn!("Notebook import unavailable, using local path: {reason}");
                }
                Err(ImportError::Failed(reason)) => {
                    remove_partial(path);
                    log::warn!("Error creating local notebook from remote: {reason}");
                    return Err(FilesError::ImportFailed(reason));
                }
            }
        } else if params.template_id.is_some() {
            match import_template(path, params, remote) {
                Ok(()) => return Ok(FileManager::new(Some(path.to_path_buf()))),
                Err(reason) => {
                    remove_partial(path);
                    log::warn!("Error creating local notebook from template: {reason}");
                    return Err(FilesError::ImportFailed(reason));
                }
            }
        }
        // No import flow (or the mechanism was unavailable): an empty file
        // at the key is how a not-yet-existing path becomes editable.
        if !path.exists() {
            fs::File::create(path)?;
            return Ok(FileManager::new(Some(path.to_path_buf())));
        }
    }

    if path.exists() {
        return Ok(FileManager::new(Some(path.to_path_buf())));
    }

    Err(FilesError::NotFound(key.to_string()))
}

/// Derive the local file names for an imported notebook from its
/// user-facing name: spaces become underscores, everything from the first
/// dot is stripped, and both the code form and the interchange form are
/// produced.
#[must_use]
pub fn derive_import_names(name: &str) -> (String, String) {
    let cleaned = name.replace(' ', "_");
    let stem = cleaned.split('.').next().unwrap_or(&cleaned);
    (format!("{stem}.py"), format!("{stem}.ipynb"))
}

enum ImportError {
    Unavailable(String),
    Failed(String),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Failed(err.to_string())
    }
}

/// Fetch the notebook's interchange form from the blob store, convert it to
/// code form next to the requested key, and return the code file's path.
fn import_notebook(
    key: &Path,
    params: &ImportParams,
    remote: &RemoteSources,
) -> std::result::Result<PathBuf, ImportError> {
    let file = params
        .file
        .as_deref()
        .ok_or_else(|| ImportError::Failed("import request named no file".to_string()))?;
    let (code_name, interchange_name) = derive_import_names(file);
    let notebook_id = params.notebook_id.as_deref().unwrap_or_default();
    let user_id = params.user_id.as_deref().unwrap_or_default();

    let resource_id = format!("{user_id}/{notebook_id}/{interchange_name}");
    let response = remote.blob.fetch(&resource_id);
    if response.status_code != 200 {
        return Err(ImportError::Failed(format!(
            "Fetching notebook {interchange_name} failed with message {}",
            response.message
        )));
    }

    // The temp file cleans itself up on every path out of this function.
    let interchange = tempfile::Builder::new()
        .suffix(".ipynb")
        .tempfile()
        .map_err(|err| ImportError::Failed(err.to_string()))?;
    fs::write(interchange.path(), &response.content)?;

    let output = match key.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(&code_name),
        _ => PathBuf::from(&code_name),
    };
    remote
        .converter
        .convert(interchange.path(), &output)
        .map_err(|err| match err {
            ConvertError::Unavailable(reason) => ImportError::Unavailable(reason),
            ConvertError::Failed(reason) => ImportError::Failed(reason),
        })?;

    log::info!("Imported notebook into {}", output.display());
    Ok(output)
}

/// Fetch a template's contents via its stored URI and write them to `key`.
fn import_template(
    key: &Path,
    params: &ImportParams,
    remote: &RemoteSources,
) -> std::result::Result<(), String> {
    let template_id = params
        .template_id
        .as_deref()
        .ok_or_else(|| "template import requested without a template id".to_string())?;
    let uri = remote
        .metadata
        .lookup_template_uri(template_id)
        .ok_or_else(|| format!("template {template_id} has no stored location"))?;

    let response = remote.blob.fetch(&uri);
    if response.status_code != 200 {
        return Err(format!(
            "Fetching template {template_id} failed with message {}",
            response.message
        ));
    }

    fs::write(key, &response.content).map_err(|err| err.to_string())?;
    log::info!("Imported template {template_id} into {}", key.display());
    Ok(())
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            log::warn!("Failed to remove partial file {}: {err}", path.display());
        }
    }
}
