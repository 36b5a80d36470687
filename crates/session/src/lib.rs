//! # Quill Session
//!
//! Session control for the notebook server: who is editing what, which
//! consumer asked, and what ancillary state must stay consistent as
//! notebooks are renamed, saved, and copied.
//!
//! ```text
//! HTTP handler
//!     │
//!     └──> SessionControlDispatcher
//!            ├─> RecentFiles        (MRU register, rename/touch)
//!            ├─> FileWatchRegistry  (per-session subscriptions, re-pointed)
//!            └─> SessionRegistry    (control queue per session, tagged
//!                                    with the originating ConsumerId)
//! ```

mod control;
mod error;
mod ids;
mod recents;
mod registry;
mod watch;

pub use control::ControlRequest;
pub use error::{Result, SessionError};
pub use ids::{ConsumerId, SessionId};
pub use recents::RecentFiles;
pub use registry::{QueuedControlRequest, Session, SessionControlDispatcher, SessionRegistry};
pub use watch::{DirectoryWatcher, FileWatchRegistry};
