use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quill_files::FilesError;
use quill_session::SessionError;

/// An HTTP-mapped failure: a status code plus a plain-text detail that names
/// only the offending logical path, never server internals.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            detail: "Edit capability required".to_string(),
        }
    }
}

impl From<FilesError> for ApiError {
    fn from(err: FilesError) -> Self {
        let status = match &err {
            FilesError::InvalidPath(_) | FilesError::ImportFailed(_) => StatusCode::BAD_REQUEST,
            FilesError::NotFound(_) => StatusCode::NOT_FOUND,
            FilesError::ScanTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            FilesError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match &err {
            SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
            SessionError::QueueClosed(_) | SessionError::WatchFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.detail).into_response()
    }
}
