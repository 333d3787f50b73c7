pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas CLI - public data service operations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server")]
    Server {
        #[arg(long, help = "Port to bind (overrides ATLAS_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Synchronize a bulk dataset into destination namespaces")]
    Sync {
        #[arg(help = "Named bulk dataset to synchronize")]
        dataset: String,
        #[arg(long, help = "Base URL of the authoritative API")]
        source: String,
        #[arg(long, help = "Bearer token for the bulk endpoints")]
        token: String,
        #[arg(long = "dest", help = "Destination namespace name (repeatable)")]
        destinations: Vec<String>,
        #[arg(long, help = "Keys per value-fetch request (overrides SYNC_CHUNK_SIZE)")]
        chunk_size: Option<usize>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Server { port } => commands::server::handle(port).await,
        Commands::Sync {
            dataset,
            source,
            token,
            destinations,
            chunk_size,
        } => commands::sync::handle(dataset, source, token, destinations, chunk_size).await,
    }
}
