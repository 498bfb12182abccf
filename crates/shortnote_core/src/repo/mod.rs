//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the note gateway is built on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Note::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to DB transport errors.

pub mod note_repo;
