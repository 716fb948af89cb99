use backend::routes::{build_router, AppState};
use backend::shared::config;
use backend::shared::data::db;
use backend::system;
use backend::usecases::u501_file_import::{ImportExecutor, ProgressTracker};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = config::load_config()?;
    system::auth::jwt::configure_secret(&config.auth.jwt_secret);

    let db_path = config::get_database_path(&config)?;
    db::initialize_database(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e:#}"))?;

    let state = AppState {
        import: Arc::new(ImportExecutor::new(
            config.import.clone(),
            Arc::new(ProgressTracker::new()),
        )),
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    addr.port()
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
