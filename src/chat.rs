//! Conversational client for a hosted Responses-style API
//!
//! The hosted model calls this server's tools itself: every turn attaches
//! an `mcp` tool pointing at the server URL, and turns are chained through
//! `previous_response_id` so no conversation state is kept here beyond the
//! last response id.
//!
//! ## Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|---------|
//! | Responses | `{endpoint}/responses` | Model turn with tool calling |
//!
//! ## Authentication
//! - Header: `Authorization: Bearer {api_key}`
//! - Azure-style deployments also need `?api-version=...`

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Tools the hosted model may call without asking
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &[
    "list_collections",
    "find_documents",
    "insert_document",
    "count_documents",
    "delete_documents",
];

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to a MongoDB \
database through tools. Always rely on real-time data from tool calls and never assume a record \
exists unless a query has confirmed it. Use list_collections to discover what is stored, \
find_documents and count_documents to answer questions, and insert_document only after the user \
has supplied every field the record needs.";

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    /// Sent as `api-version` when set
    pub api_version: Option<String>,
    pub model: String,
    /// Public URL of the MCP server the model should call
    pub server_url: String,
    pub server_label: String,
    pub allowed_tools: Vec<String>,
    pub system_prompt: String,
}

impl ChatConfig {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: None,
            model: DEFAULT_MODEL.to_string(),
            server_url: server_url.into(),
            server_label: "mongodb".to_string(),
            allowed_tools: DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponsesRequest<'a> {
    model: &'a str,
    tools: Vec<McpToolSpec<'a>>,
    tool_choice: &'static str,
    input: Vec<InputMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct McpToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    server_label: &'a str,
    server_url: &'a str,
    require_approval: &'static str,
    allowed_tools: &'a [String],
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body, reduced to what the client reads
#[derive(Debug, Deserialize)]
pub struct ResponsesReply {
    pub id: String,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(other)]
    Other,
}

impl ResponsesReply {
    /// Concatenated text of every assistant message in the output
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content } => Some(content),
                OutputItem::Other => None,
            })
            .flatten()
            .filter_map(|part| match part {
                OutputContent::OutputText { text } => Some(text.as_str()),
                OutputContent::Other => None,
            })
            .collect()
    }
}

/// Multi-turn chat session
pub struct ChatClient {
    client: Client,
    config: ChatConfig,
    previous_response_id: Option<String>,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            previous_response_id: None,
        })
    }

    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.config.endpoint.trim_end_matches('/'))
    }

    /// Id of the last response, chained into the next turn
    pub fn previous_response_id(&self) -> Option<&str> {
        self.previous_response_id.as_deref()
    }

    pub fn build_request<'a>(&'a self, user_input: &'a str) -> ResponsesRequest<'a> {
        ResponsesRequest {
            model: &self.config.model,
            tools: vec![McpToolSpec {
                kind: "mcp",
                server_label: &self.config.server_label,
                server_url: &self.config.server_url,
                require_approval: "never",
                allowed_tools: &self.config.allowed_tools,
            }],
            tool_choice: "auto",
            input: vec![
                InputMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                InputMessage {
                    role: "user",
                    content: user_input,
                },
            ],
            previous_response_id: self.previous_response_id.as_deref(),
        }
    }

    /// Send one user turn and return the assistant's text
    pub async fn send(&mut self, user_input: &str) -> Result<String> {
        let url = self.responses_url();
        debug!("Responses request to: {}", url);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(user_input));
        if let Some(version) = &self.config.api_version {
            request = request.query(&[("api-version", version)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send Responses request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Responses API error {}: {}", status, body));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .context("Failed to parse Responses reply")?;

        self.previous_response_id = Some(reply.id.clone());
        Ok(reply.output_text())
    }
}

/// Whether a line of user input ends the session
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}
