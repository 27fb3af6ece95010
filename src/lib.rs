//! # MongoDB MCP Server
//!
//! A Model Context Protocol (MCP) server exposing MongoDB collections to an
//! LLM agent as JSON-RPC tools, plus a minimal conversational client that
//! drives a hosted model with those tools enabled.
//!
//! ## Features
//!
//! - **Seven tools**: list collections, find, insert, update, delete, count, aggregate
//! - **Normalization**: `_id` strings become ObjectIds, `...Z` strings become dates on insert
//! - **One schema**: the schema advertised by `tools/list` is the one arguments are validated against
//! - **MCP Protocol**: JSON-RPC over HTTP or stdio
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   MCP Client    │    │    Dispatcher    │    │  Store Gateway  │
//! │                 │    │                  │    │                 │
//! │ • HTTP POST /   │◄──►│ • initialize     │◄──►│ • MongoDB       │
//! │ • stdio         │    │ • tools/list     │    │ • one client    │
//! │ • chat client   │    │ • tools/call     │    │ • ping on start │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```

pub mod chat;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod protocol;
#[cfg(feature = "server")]
pub mod server;
pub mod tools;

pub use dispatch::Dispatcher;
pub use error::{McpError, Result};
pub use gateway::{DocumentStore, MongoGateway, StoreConfig, UpdateSummary};
#[cfg(feature = "server")]
pub use server::{McpServer, ServerConfig};
pub use tools::{Operation, ToolRegistry};
