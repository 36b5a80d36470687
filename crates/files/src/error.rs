use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilesError>;

#[derive(Error, Debug)]
pub enum FilesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path {0} is not a valid file or directory")]
    InvalidPath(String),

    #[error("File {0} not found")]
    NotFound(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Request timed out: {0}")]
    ScanTimeout(String),
}
