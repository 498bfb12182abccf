//! Note domain model.
//!
//! # Responsibility
//! - Define the `Note` record and the strongly-typed `NoteId` key.
//! - Validate identifier shape and content length before any storage access.
//!
//! # Invariants
//! - `NoteId` is exactly 6 characters from the 62-symbol alphabet.
//! - `content` is 1..=400 characters (Unicode scalar values).
//! - `created_at <= last_edited_at` whenever `last_edited_at` is set.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of characters in every note identifier.
pub const NOTE_ID_LEN: usize = 6;

/// Case-sensitive identifier alphabet: digits, lowercase, uppercase.
pub const NOTE_ID_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Upper bound for note content, in characters.
pub const NOTE_CONTENT_MAX_CHARS: usize = 400;

/// Field-level validation failure for note identifiers and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Identifier is not exactly `NOTE_ID_LEN` characters long.
    IdLength { actual: usize },
    /// Identifier contains a character outside `NOTE_ID_ALPHABET`.
    IdCharacter { value: String, invalid: char },
    /// Content is empty.
    EmptyContent,
    /// Content contains only whitespace.
    BlankContent,
    /// Content exceeds `NOTE_CONTENT_MAX_CHARS`.
    ContentTooLong { actual: usize },
    /// Persisted edit timestamp precedes creation timestamp.
    EditedBeforeCreated {
        created_at: i64,
        last_edited_at: i64,
    },
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdLength { actual } => write!(
                f,
                "note id must be exactly {NOTE_ID_LEN} characters, got {actual}"
            ),
            Self::IdCharacter { value, invalid } => write!(
                f,
                "note id `{value}` contains unsupported character `{invalid}`"
            ),
            Self::EmptyContent => write!(f, "note content cannot be empty"),
            Self::BlankContent => write!(f, "note content cannot be blank"),
            Self::ContentTooLong { actual } => write!(
                f,
                "note content must be at most {NOTE_CONTENT_MAX_CHARS} characters, got {actual}"
            ),
            Self::EditedBeforeCreated {
                created_at,
                last_edited_at,
            } => write!(
                f,
                "last_edited_at ({last_edited_at}) must not be earlier than created_at ({created_at})"
            ),
        }
    }
}

impl Error for NoteValidationError {}

/// Short, case-sensitive note identifier.
///
/// Construction through [`NoteId::parse`] enforces both length and alphabet.
/// Lookups that only need the length rule go through [`check_lookup_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Parses a strict identifier (length + alphabet).
    pub fn parse(value: &str) -> Result<Self, NoteValidationError> {
        check_lookup_id(value)?;
        if let Some(invalid) = value
            .chars()
            .find(|ch| !ch.is_ascii() || !NOTE_ID_ALPHABET.contains(&(*ch as u8)))
        {
            return Err(NoteValidationError::IdCharacter {
                value: value.to_string(),
                invalid,
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Builds an id from alphabet indices produced by the allocator.
    ///
    /// Indices are reduced modulo the alphabet size, so the result is always
    /// well-formed.
    pub(crate) fn from_alphabet_indices(indices: [usize; NOTE_ID_LEN]) -> Self {
        let value = indices
            .iter()
            .map(|index| NOTE_ID_ALPHABET[index % NOTE_ID_ALPHABET.len()] as char)
            .collect();
        Self(value)
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = NoteValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for NoteId {
    type Error = NoteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NoteId> for String {
    fn from(value: NoteId) -> Self {
        value.0
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Canonical note record.
///
/// Timestamps are Unix epoch milliseconds. Serialized field names follow the
/// public JSON contract (`createdAt`, `lastEditedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Primary key, immutable after creation.
    pub id: NoteId,
    /// Plain-text body; replaced wholesale on update.
    pub content: String,
    /// Set once at creation.
    pub created_at: i64,
    /// `None` until the first successful update.
    pub last_edited_at: Option<i64>,
}

impl Note {
    /// Creates an unedited note record.
    pub fn new(id: NoteId, content: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            content: content.into(),
            created_at,
            last_edited_at: None,
        }
    }

    /// Returns whether this note has been updated at least once.
    pub fn is_edited(&self) -> bool {
        self.last_edited_at.is_some()
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_content(&self.content)?;
        if let Some(last_edited_at) = self.last_edited_at {
            if last_edited_at < self.created_at {
                return Err(NoteValidationError::EditedBeforeCreated {
                    created_at: self.created_at,
                    last_edited_at,
                });
            }
        }
        Ok(())
    }
}

/// Validates the length-only identifier rule used by lookups.
///
/// Out-of-alphabet characters are accepted here; such ids can never match a
/// stored note and simply resolve to "not found".
pub fn check_lookup_id(value: &str) -> Result<&str, NoteValidationError> {
    let actual = value.chars().count();
    if actual != NOTE_ID_LEN {
        return Err(NoteValidationError::IdLength { actual });
    }
    Ok(value)
}

/// Validates content length bounds without altering the text.
pub fn validate_content(content: &str) -> Result<(), NoteValidationError> {
    let actual = content.chars().count();
    if actual == 0 {
        return Err(NoteValidationError::EmptyContent);
    }
    if actual > NOTE_CONTENT_MAX_CHARS {
        return Err(NoteValidationError::ContentTooLong { actual });
    }
    Ok(())
}

/// Validates replacement content: length bounds plus non-blank after trimming.
pub fn validate_replacement_content(content: &str) -> Result<(), NoteValidationError> {
    validate_content(content)?;
    if content.trim().is_empty() {
        return Err(NoteValidationError::BlankContent);
    }
    Ok(())
}

/// Trims surrounding whitespace and validates the result.
pub fn normalize_content(content: &str) -> Result<String, NoteValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() && !content.is_empty() {
        return Err(NoteValidationError::BlankContent);
    }
    validate_content(trimmed)?;
    Ok(trimmed.to_string())
}
