//! Note gateway service.
//!
//! # Responsibility
//! - Expose the exists/create/get/update contract over any `NoteRepository`.
//! - Run allocate-and-create (`publish`) with the bounded retry policy.
//! - Translate repository failures into the caller-facing error taxonomy.
//!
//! # Invariants
//! - Validation errors are reported before any storage call.
//! - Raw driver errors never escape; they surface as `StorageUnavailable`.
//! - The service holds no state between calls besides its repository.

use crate::alloc::{allocate, RandomIdGenerator};
use crate::config::{CoreConfig, DEFAULT_MAX_ALLOC_ATTEMPTS};
use crate::db::DbError;
use crate::model::note::{
    check_lookup_id, normalize_content, validate_content, validate_replacement_content, Note,
    NoteId, NoteValidationError,
};
use crate::repo::note_repo::{NoteRepository, RepoError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Caller-facing error taxonomy for note operations.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Malformed identifier or out-of-range content. Not retryable.
    InvalidInput(NoteValidationError),
    /// No note is stored under the identifier.
    NotFound(String),
    /// The identifier is already taken; allocate a new one.
    DuplicateId(NoteId),
    /// Every candidate identifier collided. Safe to retry later.
    AllocationExhausted { attempts: u32 },
    /// Transport, connection, or storage-integrity failure.
    StorageUnavailable(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl NoteServiceError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::DuplicateId(_) => "duplicate_id",
            Self::AllocationExhausted { .. } => "allocation_exhausted",
            Self::StorageUnavailable(_) | Self::InconsistentState(_) => "storage_unavailable",
        }
    }

    /// Returns whether the failure was caused by caller input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns whether storage was reachable but locked by another writer.
    pub fn is_storage_busy(&self) -> bool {
        matches!(self, Self::StorageUnavailable(RepoError::Db(err)) if err.is_busy())
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::DuplicateId(id) => write!(f, "note id already exists: {id}"),
            Self::AllocationExhausted { attempts } => write!(
                f,
                "could not allocate a unique note id after {attempts} attempt(s)"
            ),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::DuplicateId(id) => Self::DuplicateId(id),
            other => Self::StorageUnavailable(other),
        }
    }
}

impl From<NoteValidationError> for NoteServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<DbError> for NoteServiceError {
    fn from(value: DbError) -> Self {
        Self::StorageUnavailable(RepoError::Db(value))
    }
}

/// Note gateway over a repository implementation.
pub struct NoteService<R: NoteRepository> {
    repo: R,
    max_alloc_attempts: u32,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service with the default allocation attempt cap.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_alloc_attempts: DEFAULT_MAX_ALLOC_ATTEMPTS,
        }
    }

    /// Creates a service using the allocation policy from `config`.
    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self::new(repo).with_max_alloc_attempts(config.max_alloc_attempts)
    }

    /// Overrides the allocation attempt cap.
    pub fn with_max_alloc_attempts(mut self, attempts: u32) -> Self {
        self.max_alloc_attempts = attempts;
        self
    }

    /// Returns the effective allocation attempt cap.
    pub fn max_alloc_attempts(&self) -> u32 {
        self.max_alloc_attempts
    }

    /// Returns whether a note exists under `id`.
    ///
    /// # Errors
    /// - `InvalidInput` when `id` is not exactly 6 characters.
    /// - `StorageUnavailable` when the store cannot be queried.
    pub fn exists(&self, id: &str) -> Result<bool, NoteServiceError> {
        check_lookup_id(id)?;
        Ok(self.repo.note_exists(id)?)
    }

    /// Creates a note under a caller-chosen identifier.
    ///
    /// Content is stored as given; only its length is checked.
    pub fn create(&self, id: &str, content: &str) -> Result<Note, NoteServiceError> {
        let id = NoteId::parse(id)?;
        validate_content(content)?;
        self.insert_and_read_back(Note::new(id, content, now_epoch_ms()))
    }

    /// Gets one note by identifier.
    pub fn get(&self, id: &str) -> Result<Note, NoteServiceError> {
        check_lookup_id(id)?;
        self.repo
            .get_note(id)?
            .ok_or_else(|| NoteServiceError::NotFound(id.to_string()))
    }

    /// Replaces note content and advances `last_edited_at`.
    ///
    /// Re-applying identical content still advances the edit timestamp.
    pub fn update(&self, id: &str, content: &str) -> Result<Note, NoteServiceError> {
        check_lookup_id(id)?;
        validate_replacement_content(content)?;
        self.repo.replace_note_content(id, content, now_epoch_ms())?;
        info!(
            "event=note_update module=service status=ok note_id={} content_chars={}",
            id,
            content.chars().count()
        );

        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "updated note not found in read-back",
            ))
    }

    /// Allocates a fresh identifier and stores trimmed `content` under it.
    pub fn publish(&self, content: &str) -> Result<Note, NoteServiceError> {
        let mut generator = RandomIdGenerator::new();
        self.publish_with(content, || generator.next_id())
    }

    /// `publish` with an explicit candidate source.
    ///
    /// Candidates come from `next_candidate`; each one is checked through
    /// [`NoteService::exists`] and then inserted atomically. A `DuplicateId`
    /// on insert (lost race) draws a new candidate. All draws, including those
    /// after a lost race, count against the attempt cap.
    pub fn publish_with(
        &self,
        content: &str,
        mut next_candidate: impl FnMut() -> NoteId,
    ) -> Result<Note, NoteServiceError> {
        let content = normalize_content(content)?;
        let mut drawn = 0u32;

        loop {
            let remaining = self.max_alloc_attempts.saturating_sub(drawn);
            let id = allocate(
                || {
                    drawn += 1;
                    next_candidate()
                },
                |candidate| self.exists(candidate.as_str()),
                remaining,
            )
            .map_err(|_| {
                error!(
                    "event=note_publish module=service status=error error_code=allocation_exhausted attempts={}",
                    self.max_alloc_attempts
                );
                NoteServiceError::AllocationExhausted {
                    attempts: self.max_alloc_attempts,
                }
            })?;

            match self.insert_and_read_back(Note::new(id, content.as_str(), now_epoch_ms())) {
                Err(NoteServiceError::DuplicateId(lost)) => {
                    warn!(
                        "event=note_publish module=service status=retry note_id={} reason=duplicate_id",
                        lost
                    );
                }
                other => return other,
            }
        }
    }

    fn insert_and_read_back(&self, note: Note) -> Result<Note, NoteServiceError> {
        self.repo.insert_note(&note)?;
        info!(
            "event=note_create module=service status=ok note_id={} content_chars={}",
            note.id,
            note.content.chars().count()
        );

        self.repo
            .get_note(note.id.as_str())?
            .ok_or(NoteServiceError::InconsistentState(
                "created note not found in read-back",
            ))
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
