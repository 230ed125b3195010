//! `CursorPartyServer` builder and server loop.
//!
//! This is the entry point for running a presence relay. It ties together
//! all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cursorparty_protocol::{Codec, JsonCodec, PayloadFormat};
use cursorparty_room::MembershipRegistry;
use cursorparty_session::BroadcastPipeline;
use cursorparty_transport::{Transport, TransportError, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{CursorPartyError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<MembershipRegistry>,
    pub(crate) pipeline: Arc<BroadcastPipeline>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a cursorparty server.
///
/// # Example
///
/// ```rust,ignore
/// use cursorparty::prelude::*;
///
/// let server = CursorPartyServer::builder()
///     .bind("0.0.0.0:8080")
///     .payload_format(PayloadFormat::Base64)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CursorPartyServerBuilder {
    config: ServerConfig,
}

impl CursorPartyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how position payloads are framed.
    pub fn payload_format(mut self, format: PayloadFormat) -> Self {
        self.config.payload_format = format;
        self
    }

    /// Sets the per-member outbound queue length.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets how long an accepted socket may take to finish the WebSocket
    /// upgrade before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the room name shown in logs.
    pub fn room_name(mut self, name: &str) -> Self {
        self.config.room_name = name.to_string();
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Control events are encoded with `JsonCodec`.
    pub async fn build(self) -> Result<CursorPartyServer<JsonCodec>, CursorPartyError> {
        if self.config.outbound_capacity == 0 {
            return Err(CursorPartyError::Config(
                "outbound capacity must be at least 1".into(),
            ));
        }
        if self.config.handshake_timeout.is_zero() {
            return Err(CursorPartyError::Config(
                "handshake timeout must be non-zero".into(),
            ));
        }

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Arc::new(MembershipRegistry::new()),
            pipeline: Arc::new(BroadcastPipeline::new(self.config.payload_format)),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(CursorPartyServer { transport, state })
    }
}

impl Default for CursorPartyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound cursorparty server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct CursorPartyServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl CursorPartyServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CursorPartyServerBuilder {
        CursorPartyServerBuilder::new()
    }
}

impl<C: Codec> CursorPartyServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room's membership registry.
    pub fn registry(&self) -> Arc<MembershipRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), CursorPartyError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks; only
    /// the listener stops.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), CursorPartyError>
    where
        F: Future,
    {
        let addr = self.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(
            %addr,
            room = %self.state.config.room_name,
            payload_format = %self.state.config.payload_format,
            "cursorparty server running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(pending, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        let count = self.state.registry.count().await;
        tracing::info!(count, "cursorparty server shutting down");
        Ok(())
    }
}
