use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

/// Result of fetching a blob. Non-200 statuses are recoverable failures,
/// surfaced to the caller and never retried at this layer.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub content: String,
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status_code: u16,
    pub url: Option<String>,
}

/// Remote object storage for notebook contents.
pub trait BlobStore: Send + Sync {
    fn fetch(&self, resource_id: &str) -> FetchResponse;
    fn store(&self, resource_id: &str, content: &str) -> StoreResponse;
}

/// Remote metadata about notebooks and templates. The record_* calls are
/// fire-and-forget once the primary file operation succeeded.
pub trait MetadataStore: Send + Sync {
    fn lookup_template_uri(&self, template_id: &str) -> Option<String>;
    fn record_rename(&self, notebook_id: &str, user_id: &str, new_path: &str);
    fn record_save(&self, notebook_id: &str, user_id: &str, url: Option<&str>, project_name: &str);
}

#[derive(Error, Debug)]
pub enum ConvertError {
    /// The conversion mechanism itself is missing (tool not installed).
    #[error("conversion tool unavailable: {0}")]
    Unavailable(String),

    #[error("conversion failed: {0}")]
    Failed(String),
}

/// Converts an interchange-format notebook into code form.
pub trait FormatConverter: Send + Sync {
    fn convert(&self, interchange: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// The collaborator bundle handed to the resolver.
#[derive(Clone)]
pub struct RemoteSources {
    pub blob: Arc<dyn BlobStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub converter: Arc<dyn FormatConverter>,
}

impl RemoteSources {
    /// Sources for a server running without remote import: blob fetches fail
    /// recoverably, metadata lookups miss, conversion shells out to the
    /// default tool.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            blob: Arc::new(NoBlobStore),
            metadata: Arc::new(NoMetadataStore),
            converter: Arc::new(CliConverter::default()),
        }
    }
}

pub struct NoBlobStore;

impl BlobStore for NoBlobStore {
    fn fetch(&self, resource_id: &str) -> FetchResponse {
        log::debug!("Blob store not configured; cannot fetch {resource_id}");
        FetchResponse {
            content: String::new(),
            status_code: 503,
            message: "blob store not configured".to_string(),
        }
    }

    fn store(&self, resource_id: &str, _content: &str) -> StoreResponse {
        log::debug!("Blob store not configured; cannot store {resource_id}");
        StoreResponse {
            status_code: 503,
            url: None,
        }
    }
}

pub struct NoMetadataStore;

impl MetadataStore for NoMetadataStore {
    fn lookup_template_uri(&self, template_id: &str) -> Option<String> {
        log::debug!("Metadata store not configured; no template {template_id}");
        None
    }

    fn record_rename(&self, _notebook_id: &str, _user_id: &str, _new_path: &str) {}

    fn record_save(
        &self,
        _notebook_id: &str,
        _user_id: &str,
        _url: Option<&str>,
        _project_name: &str,
    ) {
    }
}

/// Converter that shells out to an external tool
/// (`<program> convert <interchange> -o <output>`).
pub struct CliConverter {
    program: String,
}

impl CliConverter {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CliConverter {
    fn default() -> Self {
        Self::new("quill")
    }
}

impl FormatConverter for CliConverter {
    fn convert(&self, interchange: &Path, output: &Path) -> Result<(), ConvertError> {
        let result = Command::new(&self.program)
            .arg("convert")
            .arg(interchange)
            .arg("-o")
            .arg(output)
            .output();

        match result {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(
                ConvertError::Unavailable(format!("{} not found", self.program)),
            ),
            Err(err) => Err(ConvertError::Failed(err.to_string())),
            Ok(out) if !out.status.success() => Err(ConvertError::Failed(
                String::from_utf8_lossy(&out.stderr).into_owned(),
            )),
            Ok(_) => Ok(()),
        }
    }
}
