use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use helpdesk_server::config::Config;
use helpdesk_server::routes::create_routes;
use helpdesk_server::services::{BackgroundQueue, BackgroundWorker, LogMailer};
use helpdesk_server::state::AppState;
use helpdesk_server::store::{PgStore, Stores};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let store = Arc::new(PgStore::connect(&config).await?);
    tracing::info!("Successfully connected to database");

    store.migrate().await?;
    tracing::info!("Migrations run successfully");

    let stores = Stores::from_backend(store);
    let (queue, receiver) = BackgroundQueue::channel(config.queue_capacity, config.queue_overflow);
    let worker = BackgroundWorker::new(receiver, stores.clone(), Arc::new(LogMailer)).spawn();

    let state = AppState::with_stores(stores, queue, config.settings.clone());
    let app = create_routes(state, &config);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    // Dropping the router releases the last queue handle, letting the
    // worker drain what is left.
    worker.await?;
    Ok(())
}
