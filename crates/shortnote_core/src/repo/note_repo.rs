//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide existence, insert, read and full-replacement update over `notes`.
//! - Translate primary-key conflicts into `DuplicateId`.
//!
//! # Invariants
//! - Write paths validate the record before any SQL mutation.
//! - Inserts are insert-if-absent; an existing row is never overwritten.
//! - `last_edited_at` strictly increases on every update and never precedes
//!   `created_at`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::note::{
    check_lookup_id, validate_replacement_content, Note, NoteId, NoteValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    content,
    created_at,
    last_edited_at
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NotFound(String),
    DuplicateId(NoteId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::DuplicateId(id) => write!(f, "note id already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract behind the note gateway.
pub trait NoteRepository {
    /// Returns whether a note with `id` is stored. Never reads content.
    fn note_exists(&self, id: &str) -> RepoResult<bool>;
    /// Inserts a new note; fails with `DuplicateId` when the key is taken.
    fn insert_note(&self, note: &Note) -> RepoResult<()>;
    /// Gets one note by id.
    fn get_note(&self, id: &str) -> RepoResult<Option<Note>>;
    /// Replaces note content and advances `last_edited_at` to at least
    /// `edited_at`.
    fn replace_note_content(&self, id: &str, content: &str, edited_at: i64) -> RepoResult<()>;
}

impl<T: NoteRepository + ?Sized> NoteRepository for &T {
    fn note_exists(&self, id: &str) -> RepoResult<bool> {
        (**self).note_exists(id)
    }

    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        (**self).insert_note(note)
    }

    fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        (**self).get_note(id)
    }

    fn replace_note_content(&self, id: &str, content: &str, edited_at: i64) -> RepoResult<()> {
        (**self).replace_note_content(id, content, edited_at)
    }
}

/// SQLite-backed note repository over a migrated connection.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository after checking the `notes` schema is present.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn note_exists(&self, id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO notes (id, content, created_at, last_edited_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING;",
            params![
                note.id.as_str(),
                note.content.as_str(),
                note.created_at,
                note.last_edited_at,
            ],
        )?;

        if inserted == 0 {
            return Err(RepoError::DuplicateId(note.id.clone()));
        }

        Ok(())
    }

    fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        match stmt.query_row([id], read_note_columns).optional()? {
            Some(columns) => Ok(Some(parse_note_row(columns)?)),
            None => Ok(None),
        }
    }

    fn replace_note_content(&self, id: &str, content: &str, edited_at: i64) -> RepoResult<()> {
        check_lookup_id(id)?;
        validate_replacement_content(content)?;

        // MAX keeps the edit time monotonic even when two updates share a
        // millisecond or the wall clock steps backwards.
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                content = ?2,
                last_edited_at = MAX(?3, created_at, COALESCE(last_edited_at + 1, created_at))
             WHERE id = ?1;",
            params![id, content, edited_at],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

struct NoteColumns {
    id: String,
    content: String,
    created_at: i64,
    last_edited_at: Option<i64>,
}

fn read_note_columns(row: &Row<'_>) -> rusqlite::Result<NoteColumns> {
    Ok(NoteColumns {
        id: row.get("id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        last_edited_at: row.get("last_edited_at")?,
    })
}

fn parse_note_row(columns: NoteColumns) -> RepoResult<Note> {
    let id = NoteId::parse(&columns.id).map_err(|_| {
        RepoError::InvalidData(format!("invalid note id `{}` in notes.id", columns.id))
    })?;
    let note = Note {
        id,
        content: columns.content,
        created_at: columns.created_at,
        last_edited_at: columns.last_edited_at,
    };
    note.validate()
        .map_err(|err| RepoError::InvalidData(format!("note {}: {err}", note.id)))?;
    Ok(note)
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in ["id", "content", "created_at", "last_edited_at"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{NoteRepository, RepoError, SqliteNoteRepository};
    use crate::db::open_db_in_memory;
    use crate::model::note::{Note, NoteId};
    use rusqlite::Connection;

    fn note(id: &str, content: &str, created_at: i64) -> Note {
        Note::new(NoteId::parse(id).unwrap(), content, created_at)
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteNoteRepository::try_new(&conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable("notes")));
    }

    #[test]
    fn insert_is_insert_if_absent() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();

        repo.insert_note(&note("abc123", "original", 10)).unwrap();
        let err = repo
            .insert_note(&note("abc123", "intruder", 20))
            .unwrap_err();
        assert!(matches!(err, RepoError::DuplicateId(ref id) if id.as_str() == "abc123"));

        let stored = repo.get_note("abc123").unwrap().unwrap();
        assert_eq!(stored.content, "original");
        assert_eq!(stored.created_at, 10);
    }

    #[test]
    fn ids_are_case_sensitive() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();

        repo.insert_note(&note("AbCdEf", "upper-lower", 1)).unwrap();
        assert!(repo.note_exists("AbCdEf").unwrap());
        assert!(!repo.note_exists("abcdef").unwrap());
        repo.insert_note(&note("abcdef", "lower", 1)).unwrap();
    }

    #[test]
    fn replace_advances_edit_time_monotonically() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();
        repo.insert_note(&note("q1w2e3", "v1", 1_000)).unwrap();

        repo.replace_note_content("q1w2e3", "v2", 500).unwrap();
        let first = repo.get_note("q1w2e3").unwrap().unwrap();
        assert_eq!(first.last_edited_at, Some(1_000));

        repo.replace_note_content("q1w2e3", "v2", 1_000).unwrap();
        let second = repo.get_note("q1w2e3").unwrap().unwrap();
        assert_eq!(second.last_edited_at, Some(1_001));

        repo.replace_note_content("q1w2e3", "v3", 5_000).unwrap();
        let third = repo.get_note("q1w2e3").unwrap().unwrap();
        assert_eq!(third.last_edited_at, Some(5_000));
        assert_eq!(third.content, "v3");
    }

    #[test]
    fn replace_missing_note_returns_not_found() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();
        let err = repo
            .replace_note_content("ZZZZZZ", "anything", 1)
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(ref id) if id == "ZZZZZZ"));
    }

    #[test]
    fn corrupted_rows_surface_as_invalid_data() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO notes (id, content, created_at) VALUES ('ab-12!', 'x', 1);",
            [],
        )
        .unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();
        let err = repo.get_note("ab-12!").unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
