//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the note gateway contract.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod note_service;
