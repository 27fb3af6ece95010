//! JSON-RPC dispatch
//!
//! Turns one request body into one response envelope. No state is kept
//! between requests and every failure ends only the request that caused it.

use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolRequest, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    RequestId,
};
use crate::tools::{Operation, ToolRegistry};

/// Top-level RPC methods this server answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ListTools,
    CallTool,
}

impl Method {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "tools/list" => Some(Self::ListTools),
            "tools/call" => Some(Self::CallTool),
            _ => None,
        }
    }
}

/// Request dispatcher shared by all transports
#[derive(Clone)]
pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Handle a raw request body.
    ///
    /// A body that is not JSON is answered with `id: null`.
    pub async fn dispatch_bytes(&self, body: &[u8]) -> JsonRpcResponse {
        match serde_json::from_slice::<Value>(body) {
            Ok(body) => self.dispatch_value(body).await,
            Err(e) => {
                tracing::warn!("Unparseable request body: {}", e);
                error_response(RequestId::Null, &McpError::Internal(e.to_string()))
            }
        }
    }

    /// Handle a parsed body whose envelope has not been checked yet
    pub async fn dispatch_value(&self, body: Value) -> JsonRpcResponse {
        let id = RequestId::from_body(&body);
        match serde_json::from_value::<JsonRpcRequest>(body) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => error_response(id, &McpError::Internal(e.to_string())),
        }
    }

    /// Handle a well-formed request
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!(method = ?request.method, id = ?id, "Handling request");

        let method = request.method_name();
        let outcome = match Method::parse(&method) {
            Some(Method::Initialize) => self.initialize(),
            Some(Method::ListTools) => self.list_tools(),
            Some(Method::CallTool) => self.call_tool(request.params).await,
            None => Err(McpError::UnknownMethod(method)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => error_response(id, &e),
        }
    }

    fn initialize(&self) -> Result<Value> {
        Ok(serde_json::to_value(InitializeResult::default())?)
    }

    fn list_tools(&self) -> Result<Value> {
        let tools = self.tools.list_tools();
        tracing::debug!("Listing {} tools", tools.len());
        Ok(json!({ "tools": tools }))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value> {
        let request = CallToolRequest::from_params(params);
        let op = Operation::resolve(&request.name).ok_or_else(|| McpError::ToolNotFound(request.name.clone()))?;
        let arguments = request.into_arguments()?;
        tracing::debug!(tool = op.name(), arguments = ?arguments, "Calling tool");

        let value = AssertUnwindSafe(self.tools.execute(op, arguments))
            .catch_unwind()
            .await
            .map_err(|panic| McpError::ToolFailed(panic_message(panic.as_ref())))??;

        let result = CallToolResult::json(&value)?;
        Ok(serde_json::to_value(result)?)
    }
}

fn error_response(id: RequestId, err: &McpError) -> JsonRpcResponse {
    tracing::warn!(code = err.rpc_code(), "Request failed: {}", err);
    JsonRpcResponse::error(id, JsonRpcError::from(err))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool handler panicked".to_string())
}
