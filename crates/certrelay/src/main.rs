//! certrelay
//!
//! Relays certificate transparency events from certstream to Kafka or PubNub
//! and serves a liveness endpoint.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use certrelay::config::Args;
use certrelay::health::{HealthState, build_router};
use certrelay::publisher::build_publisher;
use certrelay::relay::Relay;
use certrelay::source::CertstreamSource;
use certrelay_core::Liveness;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    certrelay_core::tracing_init::init_tracing("certrelay=info,certrelay_core=info", args.log_json);

    // reqwest and tokio-tungstenite are built without a default crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?args.backend,
        port = args.port,
        certstream = %args.certstream_url,
        "Starting certrelay"
    );

    let backend = args
        .backend_config()
        .context("Invalid backend configuration")?;
    let publisher = build_publisher(&backend).context("Failed to create publisher")?;

    let liveness = Arc::new(Liveness::new());
    let app = build_router(HealthState::new(Arc::clone(&liveness), args.max_staleness()));
    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Health endpoint listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Health server stopped");
        }
    });

    let relay = Relay::new(
        CertstreamSource::new(args.certstream_config()),
        publisher,
        liveness,
        args.relay_config(),
    );

    tokio::select! {
        () = relay.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Received ctrl-c, exiting");
        }
    }
    Ok(())
}
