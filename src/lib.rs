pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod tasks;
pub mod translations;
pub mod voting;
pub mod wordcloud;

use log::{error, info};
use tokio::net::TcpListener;
use tokio::signal;

use config::Config;
use handlers::{AppState, router};

pub async fn start_server(config: Config) -> std::io::Result<()> {
    info!("Initializing state...");
    let state = AppState::new(config);

    tokio::spawn(tasks::startup_render::render_startup_clouds(state.clone()));

    let address = state.config.address();
    let app = router(state);

    info!("Binding to {}", address);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
