//! The gate server: accept loop, token-gated handshake, and the
//! outbound event pump.

use std::sync::Arc;
use std::time::Duration;

use shardgate_gate::{GameAccountStore, GateError, GateManager, SessionEvent, SessionSender};
use shardgate_net::{Conn, Listener, WsListener};
use shardgate_protocol::{AccountId, CODE_OK, Codec, GateRequest, GateResponse, JsonCodec};

use crate::{SWEEP_INTERVAL_MS, ShardgateError, wall_clock_ms};

/// A running gate server: one [`WsListener`] feeding one
/// [`GateManager`].
pub struct GateServer<S: GameAccountStore> {
    listener: WsListener,
    manager: Arc<GateManager<S>>,
}

impl<S: GameAccountStore> GateServer<S> {
    /// Binds to `addr` and wraps `manager`.
    pub async fn bind(manager: GateManager<S>, addr: &str) -> Result<Self, ShardgateError> {
        Ok(Self {
            listener: WsListener::bind(addr).await?,
            manager: Arc::new(manager),
        })
    }

    /// The bound address. Useful when binding to port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ShardgateError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the manager, for tests and tooling.
    pub fn manager(&self) -> Arc<GateManager<S>> {
        Arc::clone(&self.manager)
    }

    /// Runs the accept loop plus the expiry sweeper. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), ShardgateError> {
        let sweeper = Arc::clone(&self.manager);
        tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_millis(SWEEP_INTERVAL_MS));
            loop {
                tick.tick().await;
                sweeper.sweep(wall_clock_ms()).await;
            }
        });

        tracing::info!(shard = %self.manager.shard(), "gate server running");
        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let manager = Arc::clone(&self.manager);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, manager).await {
                            tracing::debug!(error = %e, "gate connection ended with error");
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

/// Handles one gate connection from accept to close.
///
/// The first frame must be a valid `Login`; anything else — a
/// malformed frame, a bad token, a wrong shard, a request before
/// login — terminates the connection with no response, so probes learn
/// nothing from the close.
async fn handle_connection<S: GameAccountStore>(
    conn: impl Conn,
    manager: Arc<GateManager<S>>,
) -> Result<(), ShardgateError> {
    let codec = JsonCodec;
    let session = conn.session();
    let conn = Arc::new(conn);

    let data = match conn.recv().await {
        Ok(Some(data)) => data,
        Ok(None) => return Ok(()),
        Err(e) => {
            tracing::debug!(%session, error = %e, "recv error before login");
            return Ok(());
        }
    };
    let token = match codec.decode::<GateRequest>(&data) {
        Ok(GateRequest::Login { token }) => token,
        Ok(_) => {
            tracing::debug!(%session, "request before login, terminating");
            return Ok(());
        }
        Err(e) => {
            tracing::debug!(%session, error = %e, "malformed first frame, terminating");
            return Ok(());
        }
    };

    let (sender, events) = SessionSender::channel(session);
    let (account_id, snapshot) =
        match manager.login(wall_clock_ms(), sender.clone(), &token).await {
            Ok(ok) => ok,
            Err(e @ GateError::Store(_)) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(%session, error = %e, "gate login rejected, terminating");
                return Ok(());
            }
        };

    // All outbound traffic goes through the pump so manager pushes and
    // request replies stay ordered on the socket.
    let _pump = tokio::spawn(pump_events(Arc::clone(&conn), events));
    sender.push(GateResponse::LoginAck {
        code: CODE_OK,
        account: snapshot,
    });

    let result = request_loop(conn.as_ref(), &manager, account_id, &sender).await;

    let grace = manager.config().disconnect_grace_ms;
    manager
        .disconnect(wall_clock_ms(), account_id, session, grace)
        .await?;

    // Dropping our sender (and the manager having unbound its clone)
    // lets the pump drain and exit on its own.
    drop(sender);
    result
}

/// Forwards manager events to the socket until the channel drains or
/// the socket dies.
async fn pump_events(
    conn: Arc<impl Conn>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) {
    let codec = JsonCodec;
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Push(msg) => {
                let Ok(bytes) = codec.encode(&msg) else { break };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
            SessionEvent::Close => {
                let _ = conn.close().await;
                break;
            }
        }
    }
}

async fn request_loop<S: GameAccountStore>(
    conn: &impl Conn,
    manager: &GateManager<S>,
    account_id: AccountId,
    sender: &SessionSender,
) -> Result<(), ShardgateError> {
    let codec = JsonCodec;
    let session = sender.id();
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%session, "gate connection closed");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%session, error = %e, "gate recv error");
                return Ok(());
            }
        };

        let request: GateRequest = match codec.decode(&data) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(%session, error = %e, "malformed gate frame, terminating");
                return Ok(());
            }
        };

        match request {
            GateRequest::Login { token } => {
                match manager.login(wall_clock_ms(), sender.clone(), &token).await {
                    Ok((id, snapshot)) if id == account_id => {
                        sender.push(GateResponse::LoginAck {
                            code: CODE_OK,
                            account: snapshot,
                        });
                    }
                    Ok((id, _)) => {
                        // One connection, one account. Switching
                        // accounts mid-session is not a thing; unwind
                        // the accidental bind and drop the connection.
                        tracing::warn!(%session, bound = %account_id, requested = %id,
                            "re-login for a different account, terminating");
                        let grace = manager.config().disconnect_grace_ms;
                        manager
                            .disconnect(wall_clock_ms(), id, session, grace)
                            .await?;
                        return Ok(());
                    }
                    Err(e @ GateError::Store(_)) => return Err(e.into()),
                    Err(e) => {
                        tracing::debug!(%session, error = %e, "re-login rejected, terminating");
                        return Ok(());
                    }
                }
            }
            GateRequest::GetAccountInfo => {
                match manager.account_info(account_id).await {
                    Some(account) => {
                        sender.push(GateResponse::AccountInfo { account });
                    }
                    None => {
                        tracing::warn!(%account_id, "bound account missing from cache");
                        return Ok(());
                    }
                }
            }
        }
    }
}
