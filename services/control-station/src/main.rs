use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

use skyfleet_control::ControlPlane;

mod config;
mod gitstore;
mod handlers;
mod mqtt;

use config::Config;
use gitstore::GitConfigStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    skyfleet_core::logging::init();

    let config = Config::from_env()?;

    let store = Arc::new(GitConfigStore::new(
        &config.repo_root,
        &config.git_server_address,
        &config.git_server_key,
    ));
    let (bus, eventloop) = mqtt::connect(&config).await?;
    let plane = Arc::new(ControlPlane::new(Arc::new(bus), store));

    tokio::spawn(mqtt::run_ingest(eventloop, plane.clone()));

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/missions",
            get(handlers::list_missions).post(handlers::create_mission),
        )
        .route(
            "/missions/:slug",
            get(handlers::get_mission).delete(handlers::delete_mission),
        )
        .route("/missions/:slug/drones", post(handlers::assign_drone))
        .route(
            "/missions/:slug/drones/:device_id",
            delete(handlers::remove_drone),
        )
        .route(
            "/missions/:slug/backlog",
            get(handlers::get_backlog).post(handlers::add_task),
        )
        .route("/subscribe", get(handlers::subscribe))
        .with_state(plane)
        .layer(ServiceBuilder::new().into_inner());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Control station listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
