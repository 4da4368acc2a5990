//! Network layer for Shardgate.
//!
//! Provides the [`Listener`] and [`Conn`] traits the servers are
//! written against, plus the WebSocket implementation used in
//! production. Connections carry a process-unique [`SessionId`] minted
//! at accept time; all higher layers key on it.

mod error;
mod websocket;

pub use error::NetError;
pub use websocket::{WsClientConn, WsConn, WsListener, connect};

use std::future::Future;
use std::net::SocketAddr;

use shardgate_protocol::SessionId;

/// Accepts incoming connections.
///
/// Futures are `Send` so accept loops and handlers can run under
/// `tokio::spawn`.
pub trait Listener: Send + 'static {
    type Conn: Conn;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Conn, NetError>> + Send;

    /// The address this listener is bound to. Useful when binding to
    /// port 0.
    fn local_addr(&self) -> Result<SocketAddr, NetError>;
}

/// A single connection carrying whole messages.
///
/// Send and receive lock independently, so a handler blocked in
/// [`recv`](Self::recv) never delays a concurrent push. Futures are
/// `Send` so handlers can run under `tokio::spawn`.
pub trait Conn: Send + Sync + 'static {
    /// Sends one message to the peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), NetError>> + Send;

    /// Receives the next message. `Ok(None)` means a clean close.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, NetError>> + Send;

    /// Flushes and closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), NetError>> + Send;

    /// The session id minted for this connection.
    fn session(&self) -> SessionId;
}
