//! Web server for Burrow.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::WebConfig;
use crate::file::BlobStore;
use crate::{BurrowError, Result};

use super::handlers::{AppState, SharedDatabase};
use super::middleware::JwtState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: &WebConfig,
        db: SharedDatabase,
        blobs: BlobStore,
        max_file_size: u64,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                BurrowError::Config(format!(
                    "invalid web server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        let app_state = AppState::new(db, blobs, max_file_size);
        let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state,
            web_config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_router(self) -> Router {
        create_router(
            self.app_state,
            self.jwt_state,
            &self.web_config.cors_origins,
        )
        .merge(create_health_router())
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let addr = self.addr;
        let router = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let addr = self.addr;
        let router = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
