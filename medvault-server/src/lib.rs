pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod path;
pub mod state;
pub mod telemetry;

use anyhow::Context;
use mongodb::Client;
use mongodb::bson::Document;
use tokio::net::TcpListener;
use tracing::{info, warn};

use medvault_core::{Credentials, connect_encrypted, records};

pub use config::RuntimeConfig;
pub use state::AppState;
pub use telemetry::CorrelationId;

pub async fn run(config: RuntimeConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;

    let listener = TcpListener::bind(config.bind_addr).await.with_context(|| {
        format!(
            "failed to bind http listener on {addr}",
            addr = config.bind_addr
        )
    })?;
    let http_addr = listener.local_addr()?;
    info!(%http_addr, "http server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Loads credentials, resolves the encrypted-field configuration against the
/// key vault, and opens the single shared auto-encrypting client.
pub async fn build_state(config: &RuntimeConfig) -> anyhow::Result<AppState> {
    let credentials = Credentials::from_env().context("failed to load credentials")?;
    let spec = records::collection_spec(config.namespace())
        .context("invalid encrypted-field layout")?;
    let client = connect_encrypted(
        &credentials,
        config.key_vault_namespace.clone(),
        std::slice::from_ref(&spec),
    )
    .await
    .context("failed to open encrypted client")?;
    Ok(state_from_client(&client, config))
}

/// Builds the handler state from an already-open client. Lets tests wire in a
/// client with no encryption configuration attached.
pub fn state_from_client(client: &Client, config: &RuntimeConfig) -> AppState {
    let patients = client
        .database(&config.database)
        .collection::<Document>(&config.collection);
    AppState::new(patients)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
