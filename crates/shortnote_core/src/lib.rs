//! Core domain logic for shortnote.
//!
//! Publishes short text notes under random 6-character identifiers and
//! serves them back for reading and editing. This crate owns every business
//! invariant; transport layers only translate.

pub mod alloc;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use alloc::{allocate, random_note_id, AllocationExhausted, RandomIdGenerator};
pub use config::{ConfigError, CoreConfig, DEFAULT_MAX_ALLOC_ATTEMPTS};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::note::{
    Note, NoteId, NoteValidationError, NOTE_CONTENT_MAX_CHARS, NOTE_ID_ALPHABET, NOTE_ID_LEN,
};
pub use repo::note_repo::{NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
pub use service::note_service::{now_epoch_ms, NoteService, NoteServiceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
