//! TCP listener
//!
//! Accepts connections and serves each one in its own task.

use crate::server::{RequestHandler, ServerConfig, serve_connection};
use ldap_codec::ControlRegistry;
use ldap_core::{LdapError, LdapResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Server listener for accepting client connections
///
/// The control registry is built once at startup and shared by every
/// connection; each connection gets its own decoder.
///
/// # Usage Example
/// ```rust,no_run
/// use ldap_server::{RequestHandler, ServerConfig, ServerListener};
/// use ldap_codec::ControlRegistry;
/// use std::sync::Arc;
///
/// # async fn run(handler: Arc<dyn RequestHandler>) -> ldap_core::LdapResult<()> {
/// let listener = ServerListener::new(
///     ServerConfig::default(),
///     handler,
///     Arc::new(ControlRegistry::with_defaults()),
/// );
/// listener.start().await
/// # }
/// ```
pub struct ServerListener {
    config: ServerConfig,
    handler: Arc<dyn RequestHandler>,
    registry: Arc<ControlRegistry>,
}

impl ServerListener {
    /// Create a new server listener
    pub fn new(
        config: ServerConfig,
        handler: Arc<dyn RequestHandler>,
        registry: Arc<ControlRegistry>,
    ) -> Self {
        Self {
            config,
            handler,
            registry,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    ///
    /// # Errors
    /// Returns error if binding to the address fails
    pub async fn bind(&self) -> LdapResult<TcpListener> {
        TcpListener::bind(self.config.address).await.map_err(|e| {
            LdapError::Connection(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", self.config.address, e),
            ))
        })
    }

    /// Bind and accept connections indefinitely
    ///
    /// # Errors
    /// Returns error if binding to the address fails
    pub async fn start(&self) -> LdapResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> LdapResult<()> {
        log::info!("LDAP server listening on {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    log::info!("Accepted connection from {}", peer_addr);
                    self.spawn_connection(stream, peer_addr);
                }
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, peer_addr: SocketAddr) {
        let handler = self.handler.clone();
        let registry = self.registry.clone();
        let config = self.config.decoder.clone();

        tokio::spawn(async move {
            match serve_connection(stream, handler, registry, config).await {
                Ok(()) => log::info!("Connection from {} closed", peer_addr),
                Err(e) => log::error!("Error handling connection from {}: {}", peer_addr, e),
            }
        });
    }
}
