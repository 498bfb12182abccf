use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use shortnote_core::db::open_db_with_config;
use shortnote_core::{CoreConfig, NoteService, NoteServiceError, SqliteNoteRepository};

use crate::error::ApiError;

/// Shared, read-only request state.
#[derive(Clone, Debug)]
pub struct AppState {
    config: Arc<CoreConfig>,
}

impl AppState {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Runs one gateway operation on a blocking worker.
    ///
    /// A connection is opened for this operation only and dropped before the
    /// result is returned, on success and failure alike.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&NoteService<SqliteNoteRepository<'_>>) -> Result<T, NoteServiceError>
            + Send
            + 'static,
    {
        let config = Arc::clone(&self.config);
        let started_at = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || {
            let conn = open_db_with_config(&config)?;
            let repo = SqliteNoteRepository::try_new(&conn)?;
            let service = NoteService::with_config(repo, &config);
            f(&service)
        })
        .await
        .map_err(|err| {
            error!(
                "event=http_request module=server status=error operation={} error_code=worker_failed error={}",
                operation, err
            );
            ApiError::internal()
        })?;

        match &outcome {
            Ok(_) => info!(
                "event=http_request module=server status=ok operation={} duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            ),
            Err(err) => info!(
                "event=http_request module=server status=rejected operation={} error_code={} duration_ms={}",
                operation,
                log_error_code(err),
                started_at.elapsed().as_millis()
            ),
        }

        outcome.map_err(ApiError::from)
    }
}

/// Error code for request logs; lock contention is split out of
/// `storage_unavailable`.
fn log_error_code(err: &NoteServiceError) -> &'static str {
    if err.is_storage_busy() {
        "db_busy"
    } else {
        err.code()
    }
}

#[cfg(test)]
mod tests {
    use super::log_error_code;
    use shortnote_core::db::open_db_with_config;
    use shortnote_core::{CoreConfig, NoteService, NoteServiceError, SqliteNoteRepository};
    use std::time::Duration;

    #[test]
    fn lock_contention_is_logged_as_db_busy() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            busy_timeout: Duration::ZERO,
            ..CoreConfig::default().with_db_path(dir.path().join("busy.db"))
        };
        let holder = open_db_with_config(&config).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

        let blocked = open_db_with_config(&config).unwrap();
        let service =
            NoteService::with_config(SqliteNoteRepository::try_new(&blocked).unwrap(), &config);
        let err = service.create("busy01", "waiting").unwrap_err();

        assert_eq!(err.code(), "storage_unavailable");
        assert_eq!(log_error_code(&err), "db_busy");
    }

    #[test]
    fn other_failures_keep_their_code() {
        let err = NoteServiceError::NotFound("abcdef".to_string());
        assert_eq!(log_error_code(&err), "not_found");
    }
}
