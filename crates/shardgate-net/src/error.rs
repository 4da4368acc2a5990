use tokio_tungstenite::tungstenite;

/// Errors from the network layer.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The WebSocket handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// Receiving a message failed.
    #[error("receive failed: {0}")]
    Recv(#[source] tungstenite::Error),
}
