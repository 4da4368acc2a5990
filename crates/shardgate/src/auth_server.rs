//! The auth server: accept loop and per-connection request handler.

use std::sync::Arc;
use std::time::Duration;

use shardgate_auth::{AccountStore, AuthService};
use shardgate_net::{Conn, Listener, WsListener};
use shardgate_protocol::{AuthRequest, AuthResponse, Codec, JsonCodec, SessionId};

use crate::{SWEEP_INTERVAL_MS, ShardgateError, wall_clock_ms};

/// A running auth server: one [`WsListener`] feeding one
/// [`AuthService`].
pub struct AuthServer<S: AccountStore> {
    listener: WsListener,
    service: Arc<AuthService<S>>,
}

impl<S: AccountStore> AuthServer<S> {
    /// Binds to `addr` and wraps `service`.
    pub async fn bind(service: AuthService<S>, addr: &str) -> Result<Self, ShardgateError> {
        Ok(Self {
            listener: WsListener::bind(addr).await?,
            service: Arc::new(service),
        })
    }

    /// The bound address. Useful when binding to port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ShardgateError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the service, for tests and tooling.
    pub fn service(&self) -> Arc<AuthService<S>> {
        Arc::clone(&self.service)
    }

    /// Runs the accept loop plus the expiry sweeper. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), ShardgateError> {
        let sweeper = Arc::clone(&self.service);
        tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_millis(SWEEP_INTERVAL_MS));
            loop {
                tick.tick().await;
                sweeper.sweep(wall_clock_ms()).await;
            }
        });

        tracing::info!("auth server running");
        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let service = Arc::clone(&self.service);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, service).await {
                            tracing::debug!(error = %e, "auth connection ended with error");
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

/// Handles one auth connection from accept to close.
///
/// The auth server answers every well-formed request; malformed frames
/// are skipped so a buggy client can't wedge its own connection.
async fn handle_connection<S: AccountStore>(
    conn: impl Conn,
    service: Arc<AuthService<S>>,
) -> Result<(), ShardgateError> {
    let session = conn.session();
    tracing::debug!(%session, "auth connection open");

    let result = request_loop(&conn, &service, session).await;
    // The rate tracker dies with the connection.
    service.forget_session(session).await;
    result
}

async fn request_loop<S: AccountStore>(
    conn: &impl Conn,
    service: &AuthService<S>,
    session: SessionId,
) -> Result<(), ShardgateError> {
    let codec = JsonCodec;
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%session, "auth connection closed");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%session, error = %e, "auth recv error");
                return Ok(());
            }
        };

        let request: AuthRequest = match codec.decode(&data) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(%session, error = %e, "malformed auth frame skipped");
                continue;
            }
        };

        let response = match request {
            AuthRequest::Register { username, password } => {
                let code = service
                    .register(wall_clock_ms(), session, &username, &password)
                    .await?;
                AuthResponse::RegisterAck { code }
            }
            AuthRequest::Login { username, password } => {
                let outcome = service
                    .login(wall_clock_ms(), session, &username, &password)
                    .await?;
                AuthResponse::LoginAck {
                    code: outcome.code,
                    token: outcome.token,
                }
            }
        };

        conn.send(&codec.encode(&response)?).await?;
    }
}
