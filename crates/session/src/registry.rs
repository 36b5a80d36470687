use crate::control::ControlRequest;
use crate::error::{Result, SessionError};
use crate::ids::{ConsumerId, SessionId};
use crate::recents::RecentFiles;
use crate::watch::FileWatchRegistry;
use quill_files::{AppConfig, FileManager, NotebookFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// A control request queued for a session, tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedControlRequest {
    pub request: ControlRequest,
    pub from_consumer: ConsumerId,
}

/// A running session: exactly one file manager, one control queue, and a
/// file-watching flag. Dropped wholesale when the session closes.
pub struct Session {
    file_manager: FileManager,
    control_tx: mpsc::UnboundedSender<QueuedControlRequest>,
    watch_enabled: bool,
}

/// All running sessions, behind a single mutex. Listings and lookups are
/// short critical sections; nothing holds the lock across a scan.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and hand back the receiving end of its control
    /// queue (consumed by the execution engine).
    pub fn create_session(
        &self,
        session_id: SessionId,
        file_manager: FileManager,
        watch_enabled: bool,
    ) -> mpsc::UnboundedReceiver<QueuedControlRequest> {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let session = Session {
            file_manager,
            control_tx,
            watch_enabled,
        };
        log::info!("Created session {session_id}");
        self.lock().insert(session_id, session);
        control_rx
    }

    pub fn close_session(&self, session_id: &SessionId) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            log::info!("Closed session {session_id}");
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Enqueue a control request onto the session's queue, tagged with the
    /// originating consumer.
    pub fn enqueue_control_request(
        &self,
        session_id: &SessionId,
        request: ControlRequest,
        from_consumer: ConsumerId,
    ) -> Result<()> {
        let guard = self.lock();
        let session = guard
            .get(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        session
            .control_tx
            .send(QueuedControlRequest {
                request,
                from_consumer,
            })
            .map_err(|_| SessionError::QueueClosed(session_id.to_string()))
    }

    /// Run `f` against the session's file manager under the registry lock.
    pub fn with_manager<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut FileManager) -> R,
    ) -> Result<R> {
        let mut guard = self.lock();
        let session = guard
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        Ok(f(&mut session.file_manager))
    }

    pub fn manager_path(&self, session_id: &SessionId) -> Result<Option<PathBuf>> {
        self.with_manager(session_id, |manager| {
            manager.path().map(Path::to_path_buf)
        })
    }

    pub fn watch_enabled(&self, session_id: &SessionId) -> Result<bool> {
        let guard = self.lock();
        let session = guard
            .get(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        Ok(session.watch_enabled)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Keeps ancillary state consistent as sessions rename/save/copy: the
/// recents register, per-session watch subscriptions, and the control queue
/// of the owning session — one enqueue per mutating operation, tagged with
/// the originating consumer.
pub struct SessionControlDispatcher {
    registry: Arc<SessionRegistry>,
    recents: Mutex<RecentFiles>,
    watches: FileWatchRegistry,
}

impl SessionControlDispatcher {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            recents: Mutex::new(RecentFiles::default()),
            watches: FileWatchRegistry::new(),
        }
    }

    #[must_use]
    pub fn watch_registry(&self) -> &FileWatchRegistry {
        &self.watches
    }

    #[must_use]
    pub fn recent_files(&self) -> Vec<NotebookFile> {
        self.lock_recents().list()
    }

    /// A resolve produced a path-bound handle: remember it.
    pub fn on_resolve(&self, path: Option<&Path>) {
        if let Some(path) = path {
            self.lock_recents().touch(path);
        }
    }

    pub fn on_rename(
        &self,
        session_id: &SessionId,
        from_consumer: ConsumerId,
        prev_path: Option<&Path>,
        new_path: Option<&Path>,
    ) -> Result<()> {
        match (prev_path, new_path) {
            (Some(prev), Some(new)) => self.lock_recents().rename(prev, new),
            (None, Some(new)) => self.lock_recents().touch(new),
            _ => {}
        }

        let path = new_path
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.registry.enqueue_control_request(
            session_id,
            ControlRequest::Rename { path },
            from_consumer,
        )?;

        if let Some(new) = new_path {
            if self.registry.watch_enabled(session_id)? {
                self.watches.repoint(session_id, new);
            }
        }
        Ok(())
    }

    pub fn on_save(
        &self,
        session_id: &SessionId,
        from_consumer: ConsumerId,
        path: &Path,
    ) -> Result<()> {
        self.lock_recents().touch(path);
        self.registry.enqueue_control_request(
            session_id,
            ControlRequest::Save {
                path: path.display().to_string(),
            },
            from_consumer,
        )
    }

    pub fn on_copy(
        &self,
        session_id: &SessionId,
        from_consumer: ConsumerId,
        source: &Path,
        destination: &Path,
    ) -> Result<()> {
        self.lock_recents().touch(destination);
        self.registry.enqueue_control_request(
            session_id,
            ControlRequest::Copy {
                source: source.display().to_string(),
                destination: destination.display().to_string(),
            },
            from_consumer,
        )
    }

    pub fn on_save_app_config(
        &self,
        session_id: &SessionId,
        from_consumer: ConsumerId,
        config: AppConfig,
    ) -> Result<()> {
        self.registry.enqueue_control_request(
            session_id,
            ControlRequest::SaveAppConfig { config },
            from_consumer,
        )
    }

    fn lock_recents(&self) -> MutexGuard<'_, RecentFiles> {
        match self.recents.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionControlDispatcher, SessionRegistry};
    use crate::control::ControlRequest;
    use crate::ids::{ConsumerId, SessionId};
    use pretty_assertions::assert_eq;
    use quill_files::FileManager;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn session_with_manager(
        registry: &SessionRegistry,
        id: &str,
        path: Option<&str>,
        watch: bool,
    ) -> (
        SessionId,
        tokio::sync::mpsc::UnboundedReceiver<super::QueuedControlRequest>,
    ) {
        let session_id = SessionId::new(id);
        let manager = FileManager::new(path.map(PathBuf::from));
        let rx = registry.create_session(session_id.clone(), manager, watch);
        (session_id, rx)
    }

    #[tokio::test]
    async fn enqueue_targets_the_right_session() {
        let registry = SessionRegistry::new();
        let (first, mut first_rx) = session_with_manager(&registry, "s-1", None, false);
        let (_second, mut second_rx) = session_with_manager(&registry, "s-2", None, false);

        registry
            .enqueue_control_request(
                &first,
                ControlRequest::Save {
                    path: "/ws/nb.py".to_string(),
                },
                ConsumerId::new("c-1"),
            )
            .unwrap();

        let queued = first_rx.recv().await.unwrap();
        assert_eq!(queued.from_consumer, ConsumerId::new("c-1"));
        assert!(second_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_sessions_are_rejected() {
        let registry = SessionRegistry::new();
        let result = registry.enqueue_control_request(
            &SessionId::new("ghost"),
            ControlRequest::Save {
                path: String::new(),
            },
            ConsumerId::new("c-1"),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rename_dispatch_updates_recents_queue_and_watch() {
        let registry = Arc::new(SessionRegistry::new());
        let (session_id, mut rx) =
            session_with_manager(&registry, "s-1", Some("/ws/old.py"), true);

        let dispatcher = SessionControlDispatcher::new(registry.clone());
        dispatcher.on_resolve(Some(Path::new("/ws/old.py")));
        dispatcher
            .watch_registry()
            .watch(session_id.clone(), "/ws/old.py");

        dispatcher
            .on_rename(
                &session_id,
                ConsumerId::from(&session_id),
                Some(Path::new("/ws/old.py")),
                Some(Path::new("/ws/new.py")),
            )
            .unwrap();

        let recents = dispatcher.recent_files();
        assert_eq!(recents[0].path, "/ws/new.py");
        assert!(recents.iter().all(|file| file.path != "/ws/old.py"));

        let queued = rx.recv().await.unwrap();
        assert_eq!(
            queued.request,
            ControlRequest::Rename {
                path: "/ws/new.py".to_string()
            }
        );
        assert_eq!(queued.from_consumer, ConsumerId::from(&session_id));
        assert!(rx.try_recv().is_err(), "exactly one control request");

        assert_eq!(
            dispatcher.watch_registry().watched(&session_id),
            Some(PathBuf::from("/ws/new.py"))
        );
    }

    #[tokio::test]
    async fn rename_without_watching_leaves_subscriptions_alone() {
        let registry = Arc::new(SessionRegistry::new());
        let (session_id, _rx) = session_with_manager(&registry, "s-1", Some("/ws/old.py"), false);

        let dispatcher = SessionControlDispatcher::new(registry.clone());
        dispatcher
            .on_rename(
                &session_id,
                ConsumerId::from(&session_id),
                None,
                Some(Path::new("/ws/new.py")),
            )
            .unwrap();

        assert!(dispatcher.watch_registry().watched(&session_id).is_none());
        assert_eq!(dispatcher.recent_files()[0].path, "/ws/new.py");
    }

    #[tokio::test]
    async fn save_and_copy_touch_recents_and_enqueue_once() {
        let registry = Arc::new(SessionRegistry::new());
        let (session_id, mut rx) = session_with_manager(&registry, "s-1", Some("/ws/nb.py"), false);

        let dispatcher = SessionControlDispatcher::new(registry.clone());
        dispatcher
            .on_save(
                &session_id,
                ConsumerId::new("c-1"),
                Path::new("/ws/nb.py"),
            )
            .unwrap();
        dispatcher
            .on_copy(
                &session_id,
                ConsumerId::new("c-2"),
                Path::new("/ws/nb.py"),
                Path::new("/ws/nb_copy.py"),
            )
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().request,
            ControlRequest::Save {
                path: "/ws/nb.py".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap().request,
            ControlRequest::Copy {
                source: "/ws/nb.py".to_string(),
                destination: "/ws/nb_copy.py".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.recent_files()[0].path, "/ws/nb_copy.py");
    }

    #[test]
    fn manager_accessors_reflect_session_state() {
        let registry = SessionRegistry::new();
        let session_id = SessionId::new("s-1");
        registry.create_session(
            session_id.clone(),
            FileManager::new(Some(PathBuf::from("/ws/nb.py"))),
            false,
        );

        assert!(registry.contains(&session_id));
        assert_eq!(
            registry.manager_path(&session_id).unwrap(),
            Some(PathBuf::from("/ws/nb.py"))
        );
        assert!(!registry.watch_enabled(&session_id).unwrap());
        assert!(registry.close_session(&session_id));
        assert!(!registry.contains(&session_id));
    }
}
