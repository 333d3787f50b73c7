use std::sync::Arc;

use crate::app::{default_bindings, App};

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        std::env::set_var("ATLAS_PORT", port.to_string());
    }

    let config = crate::config::config();
    tracing::info!("starting Atlas API in {:?} mode", config.environment);

    let app = Arc::new(App::new(default_bindings()));
    crate::server::serve(app).await
}
