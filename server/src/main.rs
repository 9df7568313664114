use anyhow::Result;
use tracing::{error, info};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use herdbook::backend::config::AppConfig;
use herdbook::backend::{create_router, initialize_backend};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting herdbook with data directory {}", config.data_dir.display());

    let app_state = match initialize_backend(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize backend: {}", e);
            return Err(e);
        }
    };

    let listener_handle = app_state.breeding_service.spawn_change_listener();
    let app = create_router(app_state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    listener_handle.abort();
    Ok(())
}
