//! Outbound handle to a connected session.
//!
//! The manager never touches sockets. It hands each session an
//! unbounded channel; the connection task pumps [`SessionEvent`]s out
//! to the wire. A dropped receiver just makes pushes return `false`.

use shardgate_protocol::{GateResponse, SessionId};
use tokio::sync::mpsc;

/// What the manager can ask a connection task to do.
#[derive(Debug)]
pub enum SessionEvent {
    /// Send this message to the client.
    Push(GateResponse),
    /// Flush and close the connection.
    Close,
}

/// Cloneable outbound handle for one session.
#[derive(Debug, Clone)]
pub struct SessionSender {
    id: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionSender {
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { id, tx }
    }

    /// Builds a sender plus the receiving end, for connection tasks
    /// and tests.
    pub fn channel(id: SessionId) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a message. `false` means the connection task is gone.
    pub fn push(&self, msg: GateResponse) -> bool {
        self.tx.send(SessionEvent::Push(msg)).is_ok()
    }

    /// Asks the connection task to close the socket.
    pub fn close(&self) -> bool {
        self.tx.send(SessionEvent::Close).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_delivers_to_receiver() {
        let (sender, mut rx) = SessionSender::channel(SessionId(3));

        assert!(sender.push(GateResponse::RepeatLogin));
        assert!(sender.close());

        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Push(GateResponse::RepeatLogin))
        ));
        assert!(matches!(rx.recv().await, Some(SessionEvent::Close)));
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped_returns_false() {
        let (sender, rx) = SessionSender::channel(SessionId(3));
        drop(rx);

        assert!(!sender.push(GateResponse::RepeatLogin));
        assert!(!sender.close());
    }
}
