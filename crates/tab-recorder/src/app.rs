use crate::{
    AppError, AppResult,
    config::Config,
    server::{self, ServerState},
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tab_recorder_core::{
    CoordinatorService, DiscardFallback, JsonFileStore, PersistentStore, RecordingHistory,
    SystemClock,
};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tracing::{error, info, instrument, warn};

/// Time allowed for each background task to stop after shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// The coordinator daemon: one coordinator service behind an HTTP server.
pub struct App {
    pub(crate) config: Config,
}

impl App {
    /// Run until Ctrl-C.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<()> {
        info!("Tab-Recorder starting");

        let state_file = self.config.state_file_path()?;
        let store: Arc<dyn PersistentStore> = Arc::new(JsonFileStore::new(&state_file));
        info!(state_file = ?state_file, "Using state file");

        let (service, handle) = CoordinatorService::new(
            store.clone(),
            Arc::new(SystemClock),
            Arc::new(DiscardFallback),
            self.config.recording.session_settings(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let service_task = tokio::spawn(service.run(shutdown_rx.clone()));

        let listener = TcpListener::bind(self.config.server.bind_address())
            .await
            .map_err(|e| AppError::Server {
                reason: format!(
                    "Failed to bind {}: {}",
                    self.config.server.bind_address(),
                    e
                ),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let router = server::router(ServerState {
            handle,
            history: RecordingHistory::new(store),
            shutdown_rx: shutdown_rx.clone(),
        });

        let mut server_shutdown_rx = shutdown_rx;
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = server_shutdown_rx.changed().await;
        });
        let mut server_task = tokio::spawn(async move { server.await });

        info!(url = %self.config.server_url(), "Coordinator listening");

        tokio::select! {
            result = &mut server_task => {
                let _ = shutdown_tx.send(true);
                stop_task("coordinator service", service_task).await;
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(AppError::Server {
                        reason: format!("Server failed: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    }),
                    Err(e) => Err(AppError::Server {
                        reason: format!("Server task panicked: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    }),
                };
            }

            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Ctrl-C received, shutting down"),
                    Err(e) => error!(error = ?e, "Failed to listen for Ctrl-C, shutting down"),
                }
            }
        }

        let _ = shutdown_tx.send(true);
        stop_task("HTTP server", server_task).await;
        stop_task("coordinator service", service_task).await;

        info!("Tab-Recorder shut down successfully");

        Ok(())
    }
}

async fn stop_task<T>(name: &str, mut task: JoinHandle<T>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
        Ok(Ok(_)) => info!(task = name, "Stopped cleanly"),
        Ok(Err(e)) => error!(task = name, error = ?e, "Task panicked"),
        Err(_) => {
            warn!(
                task = name,
                timeout_ms = SHUTDOWN_TIMEOUT.as_millis(),
                "Task did not stop within timeout, aborting"
            );
            task.abort();
        }
    }
}
