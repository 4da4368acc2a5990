//! Scripted walkthrough of the full account lifecycle: register, log
//! in, take the token to the gate, then displace the session with a
//! duplicate login.
//!
//! Run with `RUST_LOG=info cargo run -p login-flow`.

use std::time::Duration;

use shardgate::{
    AuthConfig, AuthRequest, AuthResponse, AuthServer, AuthService, CODE_OK,
    GateConfig, GateManager, GateRequest, GateResponse, GateServer,
    MemoryAccountStore, MemoryGameAccountStore, ShardId, TokenConfig,
    TokenIssuer, TokenVerifier,
};
use shardgate_net::{Conn, WsClientConn, connect};

// Throwaway demo keypair. Real deployments load keys from disk.
const PRIVATE_PEM: &str = include_str!("../keys/test_rsa.pem");
const PUBLIC_PEM: &str = include_str!("../keys/test_rsa.pub.pem");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // --- Servers --------------------------------------------------------
    let issuer = TokenIssuer::new(PRIVATE_PEM, TokenConfig::default())?;
    let auth_config = AuthConfig {
        gate_shard: Some(ShardId(1)),
        ..AuthConfig::default()
    };
    let auth = AuthServer::bind(
        AuthService::new(MemoryAccountStore::new(), issuer, auth_config),
        "127.0.0.1:0",
    )
    .await?;
    let auth_addr = auth.local_addr()?;
    tokio::spawn(async move {
        let _ = auth.run().await;
    });

    let gate = GateServer::bind(
        GateManager::new(
            TokenVerifier::new(PUBLIC_PEM)?,
            MemoryGameAccountStore::new(),
            GateConfig::default(),
        ),
        "127.0.0.1:0",
    )
    .await?;
    let gate_addr = gate.local_addr()?;
    tokio::spawn(async move {
        let _ = gate.run().await;
    });

    tracing::info!(%auth_addr, %gate_addr, "servers up");

    // --- Register + login -------------------------------------------------
    let auth_conn = connect(&format!("ws://{auth_addr}")).await?;
    send(
        &auth_conn,
        &AuthRequest::Register {
            username: "demo".into(),
            password: "hunter2".into(),
        },
    )
    .await?;
    let ack: AuthResponse = recv(&auth_conn).await?;
    tracing::info!(?ack, "registered");

    // The per-session rate limit spaces requests 2s apart.
    tokio::time::sleep(Duration::from_millis(2_100)).await;

    send(
        &auth_conn,
        &AuthRequest::Login {
            username: "demo".into(),
            password: "hunter2".into(),
        },
    )
    .await?;
    let token = match recv(&auth_conn).await? {
        AuthResponse::LoginAck {
            code: CODE_OK,
            token: Some(token),
        } => token,
        other => {
            tracing::error!(?other, "login failed");
            return Ok(());
        }
    };
    tracing::info!("login ok, token issued");

    // --- Gate login -------------------------------------------------------
    let gate_conn = connect(&format!("ws://{gate_addr}")).await?;
    send(&gate_conn, &GateRequest::Login { token }).await?;
    let ack: GateResponse = recv(&gate_conn).await?;
    tracing::info!(?ack, "gate session bound");

    send(&gate_conn, &GateRequest::GetAccountInfo).await?;
    let info: GateResponse = recv(&gate_conn).await?;
    tracing::info!(?info, "account info");

    // --- Duplicate login displaces the first session ----------------------
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    send(
        &auth_conn,
        &AuthRequest::Login {
            username: "demo".into(),
            password: "hunter2".into(),
        },
    )
    .await?;
    let second_token = match recv(&auth_conn).await? {
        AuthResponse::LoginAck {
            token: Some(token), ..
        } => token,
        other => {
            tracing::error!(?other, "second login failed");
            return Ok(());
        }
    };

    let second_conn = connect(&format!("ws://{gate_addr}")).await?;
    send(&second_conn, &GateRequest::Login { token: second_token }).await?;
    let ack: GateResponse = recv(&second_conn).await?;
    tracing::info!(?ack, "second gate session bound");

    // The first session is told it was displaced, then closed.
    let pushed: GateResponse = recv(&gate_conn).await?;
    tracing::info!(?pushed, "first session notified");
    if gate_conn.recv().await?.is_none() {
        tracing::info!("first session closed by the gate");
    }

    Ok(())
}

async fn send<T: serde::Serialize>(
    conn: &WsClientConn,
    msg: &T,
) -> Result<(), Box<dyn std::error::Error>> {
    conn.send(&serde_json::to_vec(msg)?).await?;
    Ok(())
}

async fn recv<T: serde::de::DeserializeOwned>(
    conn: &WsClientConn,
) -> Result<T, Box<dyn std::error::Error>> {
    let data = conn.recv().await?.ok_or("connection closed")?;
    Ok(serde_json::from_slice(&data)?)
}
