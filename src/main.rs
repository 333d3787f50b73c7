use std::sync::Arc;

use atlas_api::app::{default_bindings, App};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up APP_ENV, ATLAS_PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = atlas_api::config::config();
    tracing::info!("starting Atlas API in {:?} mode", config.environment);

    let app = Arc::new(App::new(default_bindings()));
    atlas_api::server::serve(app).await
}
