use log::info;
use shortnote_core::db::open_db_with_config;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Note HTTP server.
pub struct NoteServer {
    config: ServerConfig,
}

impl NoteServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.config.core.clone()))
    }

    /// Migrates the store, then serves until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        // Fail fast on an unusable database instead of on the first request.
        drop(open_db_with_config(&self.config.core)?);

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            "event=server_start module=server status=ok bind_addr={} db_path={} max_alloc_attempts={}",
            self.config.bind_addr,
            self.config.core.db_path.display(),
            self.config.core.max_alloc_attempts
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("event=server_stop module=server status=ok");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
