use crate::auth::EditToken;
use crate::error::ApiError;
use axum::http::HeaderMap;
use quill_files::{FileInfo, FileRouter, FilesError, ImportParams, RemoteSources};
use quill_session::{QueuedControlRequest, SessionControlDispatcher, SessionId, SessionRegistry};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Header naming the session a request belongs to. The request's ConsumerId
/// is derived from it: one consumer per connected editor tab.
pub const SESSION_HEADER: &str = "quill-session-id";

pub type SharedState = Arc<AppState>;

/// Everything the handlers need: the router (replaced wholesale on
/// markdown toggles, hence the mutex), the session registry, the control
/// dispatcher, the remote collaborators, and the edit gate.
pub struct AppState {
    router: Mutex<FileRouter>,
    pub registry: Arc<SessionRegistry>,
    pub dispatcher: SessionControlDispatcher,
    pub remote: RemoteSources,
    pub edit_token: EditToken,
}

impl AppState {
    #[must_use]
    pub fn new(router: FileRouter, remote: RemoteSources, edit_token: EditToken) -> SharedState {
        let registry = Arc::new(SessionRegistry::new());
        Arc::new(Self {
            router: Mutex::new(router),
            dispatcher: SessionControlDispatcher::new(registry.clone()),
            registry,
            remote,
            edit_token,
        })
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if self.edit_token.allows(headers) {
            return Ok(());
        }
        Err(ApiError::unauthorized())
    }

    pub fn require_session(&self, headers: &HeaderMap) -> Result<SessionId, ApiError> {
        let session_id = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(SessionId::new)
            .ok_or_else(|| ApiError::not_found("Session not found"))?;
        if !self.registry.contains(&session_id) {
            return Err(ApiError::not_found("Session not found"));
        }
        Ok(session_id)
    }

    /// Resolve `key` and register a session owning the resulting handle.
    /// Returns the receiving end of the session's control queue.
    pub fn open_session(
        &self,
        session_id: SessionId,
        key: &str,
        params: &ImportParams,
        watch_enabled: bool,
    ) -> Result<mpsc::UnboundedReceiver<QueuedControlRequest>, ApiError> {
        let manager = self
            .lock_router()
            .file_manager(key, params, &self.remote)?;
        self.dispatcher.on_resolve(manager.path());
        if watch_enabled {
            if let Some(path) = manager.path() {
                self.dispatcher
                    .watch_registry()
                    .watch(session_id.clone(), path);
            }
        }
        Ok(self.registry.create_session(session_id, manager, watch_enabled))
    }

    #[must_use]
    pub fn unique_key(&self) -> Option<String> {
        self.lock_router().unique_key()
    }

    #[must_use]
    pub fn directory(&self) -> Option<PathBuf> {
        self.lock_router().directory().map(PathBuf::from)
    }

    pub fn workspace_files(&self) -> Result<Vec<FileInfo>, FilesError> {
        self.lock_router().files()
    }

    pub fn mark_stale(&self) {
        self.lock_router().mark_stale();
    }

    fn lock_router(&self) -> MutexGuard<'_, FileRouter> {
        match self.router.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
