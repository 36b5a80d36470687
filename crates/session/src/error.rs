use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session {0} not found")]
    UnknownSession(String),

    #[error("Control queue closed for session {0}")]
    QueueClosed(String),

    #[error("Watcher init failed: {0}")]
    WatchFailed(String),
}
