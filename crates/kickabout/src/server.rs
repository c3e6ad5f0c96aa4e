//! `KickaboutServer` builder and accept loop.
//!
//! This is the entry point for running the relay. It ties together the
//! layers: transport → protocol → rooms.

use std::sync::Arc;

use kickabout_protocol::JsonCodec;
use kickabout_room::RoomDirectory;
use kickabout_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::KickaboutError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// directory lock covers only room lookup and membership bookkeeping —
/// each room's own state is serialized by its actor.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomDirectory>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Kickabout server.
pub struct KickaboutServerBuilder {
    bind_addr: String,
}

impl KickaboutServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<KickaboutServer, KickaboutError> {
        let transport =
            WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomDirectory::new()),
            codec: JsonCodec,
        });

        Ok(KickaboutServer { transport, state })
    }
}

impl Default for KickaboutServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Kickabout relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KickaboutServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl KickaboutServer {
    /// Creates a new builder.
    pub fn builder() -> KickaboutServerBuilder {
        KickaboutServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: one handler task per connection, until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), KickaboutError> {
        tracing::info!("Kickabout relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
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
            }
        }
    }
}
