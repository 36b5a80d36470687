use quill_files::AppConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct BaseResponse {
    pub success: bool,
}

impl BaseResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadCodeResponse {
    pub contents: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameFileRequest {
    pub filename: String,
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveNotebookRequest {
    pub filename: String,
    pub contents: String,
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CopyNotebookRequest {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveAppConfigurationRequest {
    pub config: AppConfig,
}
