//! # Quill Server
//!
//! The HTTP surface over file routing and session control: five POST
//! endpoints (read_code, rename, save, copy, save_app_config), each gated on
//! the edit capability and attributed to the consumer named by the session
//! header.

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod state;

pub use auth::EditToken;
pub use endpoints::api_router;
pub use error::ApiError;
pub use state::{AppState, SharedState, SESSION_HEADER};
