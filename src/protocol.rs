//! MCP protocol types and message handling
//!
//! JSON-RPC envelopes, the initialize descriptor, tool definitions and
//! the input schemas tools are both advertised and validated with.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;

use crate::error::{McpError, Result};

/// JSON-RPC version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version
pub const MCP_VERSION: &str = "2025-03-26";

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "mongodb-mcp-server";

/// JSON-RPC request
///
/// Every field is lenient so a structurally odd body still yields a
/// request whose id can be echoed back. `jsonrpc` is not read at all and
/// `method` is kept as raw JSON so a non-string method is just unknown.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: RequestId,
    #[serde(default)]
    pub method: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Method as text: strings verbatim, anything else as its JSON form
    pub fn method_name(&self) -> String {
        match &self.method {
            Some(Value::String(method)) => method.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        }
    }
}

/// JSON-RPC response
///
/// Built only through [`JsonRpcResponse::success`] and [`JsonRpcResponse::error`],
/// so exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON-RPC request ID, echoed verbatim
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    #[default]
    Null,
}

impl RequestId {
    /// Best-effort id extraction from an arbitrary request body
    pub fn from_body(body: &Value) -> Self {
        body.get("id")
            .cloned()
            .and_then(|id| serde_json::from_value(id).ok())
            .unwrap_or_default()
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// JSON-RPC error codes used by this server
pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Implementation-defined: uncategorised server fault
    pub const SERVER_ERROR: i32 = -32000;
    /// Implementation-defined: tool invocation failed
    pub const TOOL_EXECUTION_FAILED: i32 = -32001;
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&McpError> for JsonRpcError {
    fn from(err: &McpError) -> Self {
        Self::new(err.rpc_code(), err.to_string())
    }
}

/// MCP server capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(
        rename = "listChanged",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub list_changed: bool,
}

/// MCP server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// MCP tool definition as listed by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// JSON Schema for tool input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Create an object schema
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a required property
    pub fn with_required(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }

    /// Check call arguments against this schema.
    ///
    /// Rejects missing required arguments, arguments the schema does not
    /// declare, and values of the wrong JSON type. `null` for an optional
    /// argument is treated as absent.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<()> {
        for name in &self.required {
            match args.get(name) {
                None | Some(Value::Null) => {
                    return Err(McpError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        name
                    )))
                }
                Some(_) => {}
            }
        }

        for (name, value) in args {
            let property = self.properties.get(name).ok_or_else(|| {
                McpError::InvalidArguments(format!("unexpected argument '{}'", name))
            })?;
            if value.is_null() {
                continue;
            }
            if !property.accepts(value) {
                return Err(McpError::InvalidArguments(format!(
                    "argument '{}' must be of type {}",
                    name, property.schema_type
                )));
            }
        }

        Ok(())
    }
}

/// Property schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: Some(description.into()),
            default: None,
        }
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self {
            schema_type: "integer".to_string(),
            description: Some(description.into()),
            default: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether `value` matches this property's JSON type
    pub fn accepts(&self, value: &Value) -> bool {
        match self.schema_type.as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        }
    }
}

/// MCP tool call request.
///
/// Read field by field from the raw params so the tool name is known
/// before the arguments are looked at.
#[derive(Debug, Clone)]
pub struct CallToolRequest {
    pub name: String,
    arguments: Option<Value>,
}

impl CallToolRequest {
    /// A missing name reads as `null`; a non-string name as its JSON form.
    pub fn from_params(params: Option<Value>) -> Self {
        let mut params = match params {
            Some(Value::Object(params)) => params,
            _ => Map::new(),
        };
        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) => other.to_string(),
            None => "null".to_string(),
        };
        Self {
            name,
            arguments: params.remove("arguments"),
        }
    }

    /// Call arguments; absent or `null` means none
    pub fn into_arguments(self) -> Result<Map<String, Value>> {
        match self.arguments {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(arguments)) => Ok(arguments),
            Some(other) => Err(McpError::InvalidArguments(format!(
                "arguments must be an object, got {}",
                other
            ))),
        }
    }
}

/// MCP tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
}

impl CallToolResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
        }
    }

    /// Create a result carrying `value` encoded as tool text
    pub fn json(value: &Value) -> Result<Self> {
        Ok(Self::text(to_tool_text(value)?))
    }
}

/// Content item in tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// JSON formatter writing `", "` between items and `": "` after keys,
/// the layout agents already see from this server's tools.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Encode a tool result object as the text carried in a `text` content item
pub fn to_tool_text(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| McpError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_echo() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "abc", "method": "initialize"})).unwrap();
        assert_eq!(req.id, RequestId::from("abc"));

        let req: JsonRpcRequest = serde_json::from_value(json!({"method": "tools/list"})).unwrap();
        assert_eq!(req.id, RequestId::Null);

        let resp = JsonRpcResponse::success(RequestId::from(7), json!({}));
        assert_eq!(serde_json::to_value(&resp).unwrap()["id"], json!(7));
        let resp = JsonRpcResponse::success(RequestId::Null, json!({}));
        assert_eq!(serde_json::to_value(&resp).unwrap()["id"], Value::Null);
    }

    #[test]
    fn test_request_id_from_body() {
        assert_eq!(RequestId::from_body(&json!({"id": 3})), RequestId::from(3));
        assert_eq!(RequestId::from_body(&json!({"id": [1, 2]})), RequestId::Null);
        assert_eq!(RequestId::from_body(&json!("not an object")), RequestId::Null);
    }

    #[test]
    fn test_request_envelope_is_lenient() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": 2.0, "id": 3, "method": "initialize"})).unwrap();
        assert_eq!(req.method_name(), "initialize");

        let req: JsonRpcRequest = serde_json::from_value(json!({"id": 4, "method": 42})).unwrap();
        assert_eq!(req.method_name(), "42");

        let req: JsonRpcRequest = serde_json::from_value(json!({"id": 5})).unwrap();
        assert_eq!(req.method_name(), "null");
    }

    #[test]
    fn test_call_tool_request_from_params() {
        let req = CallToolRequest::from_params(Some(json!({"name": "find_documents", "arguments": {"a": 1}})));
        assert_eq!(req.name, "find_documents");
        assert_eq!(req.into_arguments().unwrap().len(), 1);

        let req = CallToolRequest::from_params(Some(json!({"name": 5, "arguments": "x"})));
        assert_eq!(req.name, "5");
        assert!(matches!(req.into_arguments(), Err(McpError::InvalidArguments(_))));

        let req = CallToolRequest::from_params(None);
        assert_eq!(req.name, "null");
        assert!(req.into_arguments().unwrap().is_empty());

        let req = CallToolRequest::from_params(Some(json!({"name": "count_documents", "arguments": null})));
        assert!(req.into_arguments().unwrap().is_empty());
    }

    #[test]
    fn test_response_has_result_or_error() {
        let ok = serde_json::to_value(JsonRpcResponse::success(1.into(), json!({"x": 1}))).unwrap();
        assert!(ok.get("result").is_some());
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(JsonRpcResponse::error(
            1.into(),
            JsonRpcError::new(error_codes::SERVER_ERROR, "boom"),
        ))
        .unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"]["code"], json!(-32000));
    }

    #[test]
    fn test_initialize_result_shape() {
        let value = serde_json::to_value(InitializeResult::default()).unwrap();
        assert_eq!(value["protocolVersion"], json!(MCP_VERSION));
        assert_eq!(value["capabilities"]["tools"], json!({}));
        assert_eq!(value["serverInfo"]["name"], json!(SERVER_NAME));
        assert!(value["serverInfo"]["version"].is_string());
    }

    #[test]
    fn test_input_schema() {
        let schema = InputSchema::object()
            .with_required("collection_name", PropertySchema::string("Collection"))
            .with_property("query", PropertySchema::string("Query"))
            .with_property("limit", PropertySchema::integer("Limit").with_default(json!(10)));

        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required, vec!["collection_name".to_string()]);
        let names: Vec<_> = schema.properties.keys().cloned().collect();
        assert_eq!(names, vec!["collection_name", "query", "limit"]);

        let value = serde_json::to_value(&schema).unwrap();
        let keys: Vec<_> = value["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["collection_name", "query", "limit"]);
    }

    #[test]
    fn test_empty_schema_serializes_all_fields() {
        let value = serde_json::to_value(InputSchema::object()).unwrap();
        assert_eq!(value, json!({"type": "object", "properties": {}, "required": []}));
    }

    #[test]
    fn test_validate_arguments() {
        let schema = InputSchema::object()
            .with_required("collection_name", PropertySchema::string("Collection"))
            .with_property("limit", PropertySchema::integer("Limit"));

        let args = |v: Value| v.as_object().unwrap().clone();

        assert!(schema.validate(&args(json!({"collection_name": "Doctors"}))).is_ok());
        assert!(schema
            .validate(&args(json!({"collection_name": "Doctors", "limit": null})))
            .is_ok());

        let err = schema.validate(&args(json!({}))).unwrap_err();
        assert!(err.to_string().contains("missing required argument 'collection_name'"));

        let err = schema
            .validate(&args(json!({"collection_name": "Doctors", "sort": "x"})))
            .unwrap_err();
        assert!(err.to_string().contains("unexpected argument 'sort'"));

        let err = schema
            .validate(&args(json!({"collection_name": "Doctors", "limit": "ten"})))
            .unwrap_err();
        assert!(err.to_string().contains("must be of type integer"));

        let err = schema
            .validate(&args(json!({"collection_name": "Doctors", "limit": 2.5})))
            .unwrap_err();
        assert_eq!(err.rpc_code(), error_codes::TOOL_EXECUTION_FAILED);
    }

    #[test]
    fn test_tool_text_separators() {
        assert_eq!(to_tool_text(&json!({"count": 3})).unwrap(), r#"{"count": 3}"#);
        assert_eq!(
            to_tool_text(&json!({"collections": ["Doctors", "Patients"], "ok": true})).unwrap(),
            r#"{"collections": ["Doctors", "Patients"], "ok": true}"#
        );
        assert_eq!(to_tool_text(&json!({})).unwrap(), "{}");
    }

    #[test]
    fn test_tool_result() {
        let result = CallToolResult::json(&json!({"count": 3})).unwrap();
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value, json!({"content": [{"type": "text", "text": "{\"count\": 3}"}]}));
    }
}
