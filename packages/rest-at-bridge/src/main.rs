//! REST-AT Inbound Bridge Server
//!
//! Hosts the bridge registry behind a small HTTP API and exposes the
//! participant resource the remote coordinator drives. On shutdown every
//! registered bridge is stopped.

use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;

use rest_at_bridge::api::{self, AppState};
use rest_at_bridge::config::DEFAULT_PARTICIPANT_SEGMENT;
use rest_at_bridge::{
    BridgeFactory, BridgeRegistry, HttpEnlister, LocalBranchManager, ServiceConfig,
};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rest-at-bridge", version, about = "REST-AT inbound bridge server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "BRIDGE_PORT")]
    port: u16,

    /// Public base URL of this service, used to build participant URLs.
    /// Defaults to http://localhost:{port}/
    #[arg(long, env = "BRIDGE_BASE_URL")]
    base_url: Option<String>,

    /// Path segment for participant resources
    #[arg(long, default_value = DEFAULT_PARTICIPANT_SEGMENT, env = "BRIDGE_PARTICIPANT_SEGMENT")]
    participant_segment: String,

    /// Enlistment request timeout in seconds
    #[arg(long, default_value_t = 30, env = "BRIDGE_ENLIST_TIMEOUT_SECS")]
    enlist_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| format!("http://localhost:{}/", self.port));
        ServiceConfig {
            port: self.port,
            base_url,
            participant_segment: self.participant_segment,
            enlist_timeout_secs: self.enlist_timeout_secs,
        }
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rest_at_bridge=info,tower_http=info".into()),
        )
        .init();

    let config = Args::parse().into_config();

    tracing::info!(
        base_url = config.base_url.as_str(),
        participant_segment = config.participant_segment.as_str(),
        enlist_timeout_secs = config.enlist_timeout_secs,
        "Bridge configuration loaded"
    );

    let factory = BridgeFactory::new(
        Arc::new(LocalBranchManager::new()),
        Arc::new(HttpEnlister::new(config.enlist_timeout())),
        config.participant_segment.clone(),
    );
    let registry = BridgeRegistry::new(factory);

    let addr = format!("0.0.0.0:{}", config.port);
    let app = api::router(AppState::new(registry.clone(), config))
        .layer(TraceLayer::new_for_http());

    tracing::info!("REST-AT bridge server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Err(e) = registry.stop_all() {
        tracing::error!(error = %e, "Bridges did not stop cleanly");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
