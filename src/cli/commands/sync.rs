use std::sync::Arc;

use anyhow::Context;
use url::Url;

use crate::store::MemoryStore;
use crate::sync::{HttpBulkClient, SyncJob};

pub async fn handle(
    dataset: String,
    source: String,
    token: String,
    destinations: Vec<String>,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    if destinations.is_empty() {
        anyhow::bail!("at least one --dest namespace is required");
    }

    let base_url = Url::parse(&source).context("invalid --source URL")?;
    let chunk_size = chunk_size.unwrap_or(crate::config::config().sync.chunk_size);

    let client = HttpBulkClient::new(base_url, token).context("failed to build bulk client")?;
    let mut job = SyncJob::new(Arc::new(client), chunk_size);
    for name in &destinations {
        // Local mirror namespaces; a deployment binds its real stores here.
        job = job.with_destination(name, Arc::new(MemoryStore::default()));
    }

    let report = job
        .run(&dataset)
        .await
        .with_context(|| format!("sync of dataset '{}' failed", dataset))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
