//! mongodb-mcp
//!
//! MCP server exposing a MongoDB database as agent tools.
//!
//! # Usage
//!
//! Run as HTTP server:
//! ```bash
//! MONGODB_URI=mongodb://localhost:27017 MONGODB_DATABASE=hospital mongodb-mcp --port 5000
//! ```
//!
//! Run as stdio transport:
//! ```bash
//! mongodb-mcp --mongodb-uri mongodb://localhost:27017 --database hospital --stdio
//! ```

use clap::Parser;
use std::sync::Arc;

use mongodb_mcp::{
    server::{shutdown_signal, McpServer, ServerConfig, StdioTransport},
    Dispatcher, MongoGateway, StoreConfig, ToolRegistry,
};

/// MongoDB MCP Server
#[derive(Parser, Debug)]
#[command(name = "mongodb-mcp")]
#[command(about = "MCP server exposing MongoDB collections as tools")]
#[command(version)]
struct Args {
    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI")]
    mongodb_uri: String,

    /// Database whose collections are exposed
    #[arg(long, env = "MONGODB_DATABASE")]
    database: String,

    /// Use stdio transport instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Server host (HTTP mode only)
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port (HTTP mode only)
    #[arg(long, default_value = "5000")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for the stdio transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let store_config = StoreConfig::new(args.mongodb_uri, args.database)?;

    tracing::info!("Starting MongoDB MCP Server");
    let gateway = Arc::new(MongoGateway::connect(&store_config).await?);
    let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new(gateway.clone())));

    let outcome = if args.stdio {
        tracing::info!("Serving {} over stdio", gateway.database_name());
        StdioTransport::new(dispatcher).run().await
    } else {
        let server_config = ServerConfig {
            host: args.host,
            port: args.port,
        };
        McpServer::new(server_config, dispatcher)
            .run_until(shutdown_signal())
            .await
    };

    gateway.close().await;
    tracing::info!("MongoDB MCP Server shutdown complete");

    Ok(outcome?)
}
