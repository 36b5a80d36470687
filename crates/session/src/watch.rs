use crate::error::{Result, SessionError};
use crate::ids::SessionId;
use ignore::WalkBuilder;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use quill_files::{HIDDEN_PREFIX, SKIP_DIRS};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

/// Per-session watched-file bookkeeping. A session with file watching
/// enabled holds exactly one subscription, keyed by its id; renames re-point
/// it rather than dropping it.
#[derive(Debug, Default)]
pub struct FileWatchRegistry {
    watched: Mutex<HashMap<SessionId, PathBuf>>,
}

impl FileWatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&self, session_id: SessionId, path: impl AsRef<Path>) {
        self.lock()
            .insert(session_id, path.as_ref().to_path_buf());
    }

    pub fn unwatch(&self, session_id: &SessionId) -> Option<PathBuf> {
        self.lock().remove(session_id)
    }

    /// Re-point the session's subscription to `new`. Returns false when the
    /// session watches nothing.
    pub fn repoint(&self, session_id: &SessionId, new: impl AsRef<Path>) -> bool {
        let mut guard = self.lock();
        match guard.get_mut(session_id) {
            Some(entry) => {
                log::debug!(
                    "Re-pointing watch for session {session_id}: {} -> {}",
                    entry.display(),
                    new.as_ref().display()
                );
                *entry = new.as_ref().to_path_buf();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn watched(&self, session_id: &SessionId) -> Option<PathBuf> {
        self.lock().get(session_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, PathBuf>> {
        match self.watched.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

const EVENT_DEBOUNCE: Duration = Duration::from_millis(750);

enum WatcherCommand {
    Shutdown,
}

/// Watches a workspace directory and invokes a callback (debounced) when
/// anything relevant changes — the server uses it to mark the directory
/// router's listing stale.
#[derive(Clone)]
pub struct DirectoryWatcher {
    inner: Arc<DirectoryWatcherInner>,
}

struct DirectoryWatcherInner {
    command_tx: mpsc::Sender<WatcherCommand>,
    _watcher: Mutex<Option<RecommendedWatcher>>,
}

impl DirectoryWatcher {
    pub fn start(root: &Path, on_change: impl Fn() + Send + Sync + 'static) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(16);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|err| SessionError::WatchFailed(err.to_string()))?;

        for dir in build_watch_list(root) {
            if let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                log::warn!("Failed to watch {}: {err}", dir.display());
            }
        }

        spawn_watch_loop(root.to_path_buf(), event_rx, command_rx, on_change);

        Ok(Self {
            inner: Arc::new(DirectoryWatcherInner {
                command_tx,
                _watcher: Mutex::new(Some(watcher)),
            }),
        })
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(WatcherCommand::Shutdown);
        }
    }
}

fn spawn_watch_loop(
    root: PathBuf,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    on_change: impl Fn() + Send + Sync + 'static,
) {
    tokio::spawn(async move {
        let mut last_event: Option<Instant> = None;

        loop {
            let deadline = last_event.map(|at| at + EVENT_DEBOUNCE);

            tokio::select! {
                Some(event) = event_rx.recv() => {
                    match event {
                        Ok(evt) if event_is_relevant(&root, &evt) => {
                            last_event = Some(Instant::now());
                        }
                        Ok(_) => {}
                        Err(err) => log::warn!("Watcher error: {err}"),
                    }
                }
                Some(WatcherCommand::Shutdown) = command_rx.recv() => break,
                () = async {
                    if let Some(deadline) = deadline {
                        time::sleep_until(time::Instant::from_std(deadline)).await;
                    }
                }, if deadline.is_some() => {
                    on_change();
                    last_event = None;
                }
            }
        }
    });
}

fn event_is_relevant(root: &Path, event: &Event) -> bool {
    if event.paths.is_empty() {
        return true;
    }
    event.paths.iter().any(|path| is_relevant_path(root, path))
}

fn is_relevant_path(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    for component in relative.components() {
        if let std::path::Component::Normal(name) = component {
            let name = name.to_string_lossy();
            if name.starts_with(HIDDEN_PREFIX) {
                return false;
            }
            if SKIP_DIRS.iter().any(|skip| name.eq_ignore_ascii_case(skip)) {
                return false;
            }
        }
    }
    true
}

fn build_watch_list(root: &Path) -> Vec<PathBuf> {
    let mut out = vec![root.to_path_buf()];

    let root_owned = root.to_path_buf();
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).git_ignore(true).git_global(true);
    builder.filter_entry(move |entry| is_relevant_path(&root_owned, entry.path()));

    for entry in builder.build() {
        let Ok(entry) = entry else {
            continue;
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        if path != root {
            out.push(path.to_path_buf());
        }
    }

    out
}
