//! Log streaming server
//!
//! Binds the HTTP listener, starts the change detector and serves the
//! router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::server::routes::{create_router, AppState};
use crate::stats::DeliveryStats;
use crate::watch::ChangeDetector;

/// Log streaming server
pub struct LogServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    broadcaster: Broadcaster,
}

impl LogServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::with_config(config.registry_config()));
        let broadcaster =
            Broadcaster::with_stats(Arc::clone(&registry), Arc::new(DeliveryStats::new()));

        Self {
            config,
            registry,
            broadcaster,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Router over this server's registry, with sessions parented to `shutdown`
    pub fn router(&self, shutdown: CancellationToken) -> Router {
        let state = AppState::new(self.config.clone(), self.broadcaster.clone())
            .with_shutdown(shutdown);
        create_router(state)
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Open streams are ended by cancelling their sessions, after which the
    /// watcher is stopped.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            dir = %self.config.log_dir.display(),
            "Log streamer listening"
        );

        let root = CancellationToken::new();
        let detector = ChangeDetector::new(
            self.config.log_dir.clone(),
            self.config.filter(),
            self.broadcaster.clone(),
        );
        let watch = detector.start(root.child_token());

        let app = self.router(root.clone());
        let signal = root.clone();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await;

        root.cancel();
        watch.shutdown().await;
        tracing::info!("Log streamer stopped");

        result.map_err(Into::into)
    }
}
