//! Domain model for short-id notes.
//!
//! # Responsibility
//! - Define the canonical note record and its identifier type.
//! - Own field-level validation shared by repository and service layers.
//!
//! # Invariants
//! - Every note is addressed by exactly one `NoteId`.
//! - Notes are never deleted; there is no tombstone state.

pub mod note;
