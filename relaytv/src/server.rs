//! Server lifecycle management
//!
//! Starts the HTTP server and handles graceful shutdown on
//! SIGTERM or Ctrl+C, draining in-flight requests before closing
//! the database pool.

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use relaytv_core::{bootstrap::Services, Config};

/// `RelayTV` server - owns the HTTP listener and shared state.
pub struct RelayTvServer {
    config: Config,
    services: Services,
    pool: PgPool,
    http_handle: Option<JoinHandle<()>>,
}

impl RelayTvServer {
    /// Create a new server instance
    pub const fn new(config: Config, services: Services, pool: PgPool) -> Self {
        Self {
            config,
            services,
            pool,
            http_handle: None,
        }
    }

    /// Start the HTTP server and wait for a shutdown signal
    pub async fn start(mut self) -> anyhow::Result<()> {
        info!("Starting RelayTV server...");

        // Create shutdown signal channel
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let http_handle = self.start_http_server(shutdown_rx)?;
        self.http_handle = Some(http_handle);

        info!("Server started successfully");

        let http_handle = self
            .http_handle
            .take()
            .ok_or_else(|| anyhow::anyhow!("HTTP server handle missing after startup"))?;

        tokio::select! {
            _ = http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        // Signal the HTTP task to shut down
        let _ = shutdown_tx.send(true);

        self.shutdown().await;

        Ok(())
    }

    /// Gracefully shut down server components
    async fn shutdown(&self) {
        info!("Shutting down RelayTV server...");

        // Close the database connection pool
        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database pool closed");

        info!("RelayTV server shut down complete");
    }

    /// Start HTTP server with graceful shutdown support
    fn start_http_server(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let public_base_url = self.config.streaming.public_base_url.clone();
        let http_router = relaytv_api::http::create_router(self.services.clone(), public_base_url);

        let handle = tokio::spawn(async move {
            let http_addr: std::net::SocketAddr = match http_address.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Invalid HTTP address '{}': {}", http_address, e);
                    return;
                }
            };

            let listener = match tokio::net::TcpListener::bind(http_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind HTTP address {}: {}", http_addr, e);
                    return;
                }
            };

            info!("HTTP server listening on {}", http_addr);

            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, http_router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
