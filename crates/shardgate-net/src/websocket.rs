//! WebSocket transport via `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use shardgate_protocol::SessionId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Conn, Listener, NetError};

/// Process-wide counter for minting session ids.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// WebSocket listener for one server endpoint.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds to `addr` and starts listening.
    pub async fn bind(addr: &str) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).await.map_err(NetError::Bind)?;
        tracing::info!(addr, "listening");
        Ok(Self { listener })
    }
}

impl Listener for WsListener {
    type Conn = WsConn<TcpStream>;

    async fn accept(&mut self) -> Result<Self::Conn, NetError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(NetError::Accept)?;
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(NetError::Handshake)?;

        let session =
            SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%session, %peer, "connection accepted");
        Ok(WsConn::new(session, ws))
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.listener.local_addr().map_err(NetError::Bind)
    }
}

/// One WebSocket connection, split so sends and receives never block
/// each other.
pub struct WsConn<S> {
    session: SessionId,
    tx: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    rx: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S> WsConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(session: SessionId, ws: WebSocketStream<S>) -> Self {
        let (tx, rx) = ws.split();
        Self {
            session,
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        }
    }
}

impl<S> Conn for WsConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    async fn send(&self, data: &[u8]) -> Result<(), NetError> {
        let msg = Message::Binary(data.to_vec().into());
        self.tx
            .lock()
            .await
            .send(msg)
            .await
            .map_err(NetError::Send)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, NetError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(e)) => return Err(NetError::Recv(e)),
            }
        }
    }

    async fn close(&self) -> Result<(), NetError> {
        self.tx.lock().await.close().await.map_err(NetError::Send)
    }

    fn session(&self) -> SessionId {
        self.session
    }
}

/// Client-side connection type returned by [`connect`].
pub type WsClientConn = WsConn<MaybeTlsStream<TcpStream>>;

/// Dials a server as a client. Used by the demo and tests.
pub async fn connect(url: &str) -> Result<WsClientConn, NetError> {
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(NetError::Handshake)?;
    let session = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
    Ok(WsConn::new(session, ws))
}
