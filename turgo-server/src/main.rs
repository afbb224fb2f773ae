use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};
use turgo_core::{ContentProvider, WordBank};
use turgo_server::{
    config::Config, create_routes, session_registry::SessionRegistry, timers::SessionTimings,
    websocket::{ConnectionManager, RateLimiter},
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Turgo server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    let content: Arc<dyn ContentProvider> = match &config.content_directory {
        Some(dir) => {
            info!("Loading content from directory: {}", dir);
            match WordBank::from_dir(dir) {
                Ok(bank) if !bank.is_empty() => Arc::new(bank),
                Ok(_) => {
                    error!("Content directory '{}' has no usable entries", dir);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Failed to load content from '{}': {:#}", dir, e);
                    error!("Unset CONTENT_DIRECTORY to use the built-in word bank.");
                    std::process::exit(1);
                }
            }
        }
        None => {
            info!("Using built-in word bank");
            Arc::new(WordBank::builtin())
        }
    };

    let registry = Arc::new(SessionRegistry::new(
        connection_manager.clone(),
        content,
        SessionTimings::from_config(&config),
    ));

    let routes = create_routes(
        connection_manager.clone(),
        registry.clone(),
        RateLimiter::from_config(&config),
    );

    // Sweep idle connections; dropping a connection ends its socket, which removes its team
    let sweep_connection_manager = connection_manager.clone();
    let connection_timeout = config.connection_timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweep_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
            if !removed.is_empty() {
                info!("Swept {} idle connections", removed.len());
            }
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((host, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
            Ok(sigint) => sigint,
            Err(e) => {
                error!("Failed to listen for SIGINT: {}", e);
                return std::future::pending().await;
            }
        };
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return std::future::pending().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
