use std::env;

use restgate_config::load_config;
use restgate_server::{AppState, build_router, observability};

#[tokio::main]
async fn main() {
    // Load .env if present; environment overrides are part of the
    // configuration contract.
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: failed to load .env file: {e}");
    }

    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("RESTGATE_CONFIG").ok());
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    observability::init_tracing(&config.logging.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(%addr, "restgate listening");
    if let Err(e) = axum::serve(listener, build_router(state)).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
