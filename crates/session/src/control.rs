use quill_files::AppConfig;
use serde::{Deserialize, Serialize};

/// A structured message describing a state-changing operation, destined for
/// the owning session's processing queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ControlRequest {
    Rename { path: String },
    Save { path: String },
    Copy { source: String, destination: String },
    SaveAppConfig { config: AppConfig },
}
