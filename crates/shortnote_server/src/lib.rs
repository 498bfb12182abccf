//! JSON HTTP boundary for shortnote.
//!
//! Exposes the note gateway (existence check, create, read, update) plus a
//! server-side publish endpoint. Each request opens its own SQLite
//! connection on a blocking worker and releases it before responding.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use server::NoteServer;
pub use state::AppState;
