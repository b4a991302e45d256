use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use chess_relay_core::{Analyzer, AnalyzerSettings, Config, EngineTransport, RequestPolicy, TransportKind};

mod error;
mod routes;

pub struct AppState<T> {
    pub analyzer: Analyzer<T>,
    pub policy: RequestPolicy,
    pub transport: TransportKind,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    match config.transport {
        TransportKind::Ssh => tracing::info!(
            host = %config.ssh.host,
            port = config.ssh.port,
            user = %config.ssh.user,
            "Using SSH engine transport"
        ),
        TransportKind::Local => tracing::info!(engine = %config.engine_path, "Using local engine transport"),
    }

    let state = Arc::new(AppState {
        analyzer: Analyzer::new(
            EngineTransport::from_config(&config),
            AnalyzerSettings::from_config(&config),
        ),
        policy: config.request_policy,
        transport: config.transport,
    });

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
