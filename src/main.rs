use std::net::SocketAddr;
use std::sync::Arc;

use attendance_server::config::Config;
use attendance_server::state::AppState;
use attendance_server::storage::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load();
    let store = JsonFileStore::open(&config.db_path).await?;
    log::info!("Using data file {}", store.path().display());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let base_url = config.base_url.clone();
    let state = AppState::new(config, Arc::new(store)).await?;
    let app = attendance_server::app(state);

    log::info!("Starting attendance server on http://{}", addr);
    log::info!("Server is running! Access it at {}", base_url);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
