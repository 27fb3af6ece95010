//! mongodb-mcp-chat
//!
//! Interactive chat session with a hosted model that queries the
//! MongoDB MCP server through tool calls.
//!
//! ```bash
//! OPENAI_API_KEY=... MONGODB_MCP_SERVER_URL=https://my-host.example mongodb-mcp-chat
//! ```

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use mongodb_mcp::chat::{is_exit_command, ChatClient, ChatConfig, DEFAULT_MODEL};

/// Chat with a hosted model that uses the MongoDB MCP tools
#[derive(Parser, Debug)]
#[command(name = "mongodb-mcp-chat")]
#[command(version)]
struct Args {
    /// API key for the hosted model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the Responses API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    endpoint: String,

    /// `api-version` query parameter, for Azure-style deployments
    #[arg(long, env = "OPENAI_API_VERSION")]
    api_version: Option<String>,

    /// Model or deployment name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Public URL of the MongoDB MCP server
    #[arg(long, env = "MONGODB_MCP_SERVER_URL")]
    server_url: String,

    /// File holding a system prompt to use instead of the default
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ChatConfig::new(args.api_key, args.endpoint, args.server_url);
    config.model = args.model;
    config.api_version = args.api_version;
    if let Some(path) = args.system_prompt_file {
        config.system_prompt = tokio::fs::read_to_string(&path).await?;
    }

    let mut client = ChatClient::new(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match client.send(&line).await {
            Ok(text) => println!("Assistant: {}", text),
            Err(e) => tracing::error!("Turn failed: {:#}", e),
        }
    }

    Ok(())
}
