//! # Quill Files
//!
//! File routing for the notebook server.
//!
//! ## Pipeline
//!
//! ```text
//! Path / key / "__new__"
//!     │
//!     ├──> Router (single file | directory | explicit list | new file)
//!     │      ├─> Classifier (content-based notebook check)
//!     │      └─> Bounded Scanner (depth + wall-clock limits, pruned tree)
//!     │
//!     └──> Resolver (local path, remote import, or unsaved handle)
//!            └─> FileManager (session-owned read/write handle)
//! ```

mod classify;
mod error;
mod manager;
mod models;
mod natural_sort;
mod path;
mod remote;
mod resolver;
mod router;
mod scanner;

pub use classify::{
    classify, is_notebook, PathKind, APP_DECLARATION_MARKER, FRAMEWORK_IMPORT_MARKER,
    MARKDOWN_VERSION_MARKER,
};
pub use error::{FilesError, Result};
pub use manager::{AppConfig, FileManager};
pub use models::{FileInfo, NotebookFile};
pub use natural_sort::{natural_key, Segment};
pub use path::NotebookPath;
pub use remote::{
    BlobStore, CliConverter, ConvertError, FetchResponse, FormatConverter, MetadataStore,
    NoBlobStore, NoMetadataStore, RemoteSources, StoreResponse,
};
pub use resolver::{derive_import_names, resolve, ImportParams, NEW_FILE_KEY};
pub use router::{DirectoryRouter, FileRouter};
pub use scanner::{WorkspaceScanner, HIDDEN_PREFIX, MAX_DEPTH, MAX_EXECUTION_TIME, SKIP_DIRS};
