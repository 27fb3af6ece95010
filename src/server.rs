//! MCP server implementation using Axum
//!
//! Provides the HTTP transport (a single JSON-RPC endpoint plus a health
//! check) and a newline-delimited stdio transport over the same dispatcher.

use axum::{
    body::Bytes,
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::dispatch::Dispatcher;
use crate::error::{McpError, Result};
use crate::protocol::JsonRpcResponse;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Shared server state
pub struct ServerState {
    dispatcher: Dispatcher,
}

/// MCP Server
pub struct McpServer {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            state: Arc::new(ServerState { dispatcher }),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_mcp_request))
            .route("/health", get(health))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// In-flight requests are not drained beyond what axum's graceful
    /// shutdown does on its own.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("MongoDB MCP Server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| McpError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Get server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Handle MCP JSON-RPC request.
///
/// The body is taken raw so malformed JSON still gets a JSON-RPC error
/// envelope with HTTP 200 instead of an extractor rejection.
async fn handle_mcp_request(State(state): State<Arc<ServerState>>, body: Bytes) -> Json<JsonRpcResponse> {
    Json(state.dispatcher.dispatch_bytes(&body).await)
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

/// Stdio transport for MCP
pub struct StdioTransport {
    dispatcher: Dispatcher,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Run the stdio transport until EOF
    pub async fn run(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited requests from `input`, one response line each
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: tokio::io::AsyncWrite + Unpin,
    {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let mut lines = BufReader::new(input).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.dispatcher.dispatch_bytes(line.as_bytes()).await;
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
        }

        Ok(())
    }
}
