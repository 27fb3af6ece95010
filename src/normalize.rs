//! Conversion between wire JSON and store-native BSON
//!
//! Queries, documents and pipelines arrive as JSON-encoded strings inside
//! tool arguments and are decoded here, nowhere deeper. Coercion of
//! identifiers and timestamps is shallow: only top-level fields are
//! touched, nested documents and arrays pass through as-is.

use bson::{oid::ObjectId, Bson, Document};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{McpError, Result};

/// Field holding the document identifier
pub const ID_FIELD: &str = "_id";

/// Which argument a JSON payload came from, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Query,
    Document,
    QueryOrUpdate,
    Pipeline,
}

impl Payload {
    fn invalid(self) -> McpError {
        let message = match self {
            Self::Query => "Invalid JSON query format",
            Self::Document => "Invalid JSON document format",
            Self::QueryOrUpdate => "Invalid JSON format in query or update",
            Self::Pipeline => "Invalid JSON pipeline format",
        };
        McpError::InvalidJson(message.to_string())
    }
}

/// Parse an optional query string, treating empty or absent as the empty filter.
pub fn to_store_query(raw: Option<&str>) -> Result<Document> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Document::new()),
        Some(raw) => to_required_query(raw, Payload::Query),
    }
}

/// Parse a query string that must be present, coercing a string `_id`
/// into an `ObjectId`.
pub fn to_required_query(raw: &str, payload: Payload) -> Result<Document> {
    let mut filter = parse_object(raw, payload)?;
    if let Some(Bson::String(id)) = filter.get(ID_FIELD) {
        let oid = ObjectId::parse_str(id).map_err(|_| McpError::InvalidIdentifier)?;
        filter.insert(ID_FIELD, oid);
    }
    Ok(filter)
}

/// Parsed update specification
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Operator document such as `{"$set": {...}}`
    Modifiers(Document),
    /// Aggregation-pipeline update, a list of stages
    Pipeline(Vec<Document>),
}

/// Parse an update specification: an operator document or a list of
/// pipeline stages. No coercion is applied.
pub fn to_store_update(raw: &str) -> Result<Update> {
    let payload = Payload::QueryOrUpdate;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Update::Modifiers(json_object_to_document(map, payload)?)),
        Ok(Value::Array(stages)) => Ok(Update::Pipeline(to_stages(stages, payload, payload.invalid())?)),
        _ => Err(payload.invalid()),
    }
}

/// Parse a document for insertion.
///
/// Top-level strings ending in `Z` that parse as ISO-8601 date-times are
/// stored as native dates; strings that fail to parse are kept verbatim.
pub fn to_store_document(raw: &str) -> Result<Document> {
    let mut document = parse_object(raw, Payload::Document)?;
    for (_, value) in document.iter_mut() {
        let timestamp = match value {
            Bson::String(text) => parse_utc_timestamp(text),
            _ => None,
        };
        if let Some(timestamp) = timestamp {
            *value = Bson::DateTime(bson::DateTime::from_chrono(timestamp));
        }
    }
    Ok(document)
}

/// Parse an aggregation pipeline: a JSON array of stage objects.
pub fn to_store_pipeline(raw: &str) -> Result<Vec<Document>> {
    let value: Value = serde_json::from_str(raw).map_err(|_| Payload::Pipeline.invalid())?;
    match value {
        Value::Array(stages) => to_stages(stages, Payload::Pipeline, McpError::InvalidPipeline),
        _ => Err(McpError::InvalidPipeline),
    }
}

fn to_stages(stages: Vec<Value>, payload: Payload, not_a_stage: McpError) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(stages.len());
    for stage in stages {
        match stage {
            Value::Object(stage) => documents.push(json_object_to_document(stage, payload)?),
            _ => return Err(not_a_stage),
        }
    }
    Ok(documents)
}

/// Render a stored document as JSON-safe output.
///
/// Top-level `ObjectId`s become hex strings and top-level dates become
/// RFC 3339 text. Everything else, nested values included, uses relaxed
/// extended JSON.
pub fn from_store_document(document: Document) -> Value {
    let map: Map<String, Value> = document
        .into_iter()
        .map(|(key, value)| (key, from_store_value(value)))
        .collect();
    Value::Object(map)
}

/// Render a single top-level value, e.g. an inserted id.
pub fn from_store_value(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(format_timestamp(dt.to_chrono())),
        other => other.into_relaxed_extjson(),
    }
}

/// Textual form of a top-level identifier: hex for `ObjectId`, the string
/// itself for string ids, compact JSON otherwise.
pub fn identifier_to_string(id: Bson) -> String {
    match from_store_value(id) {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// RFC 3339 in UTC with a `Z` suffix, so the value re-coerces on insert.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Speculative ISO-8601 parse of a string ending in `Z`.
pub fn parse_utc_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let naive = text.strip_suffix('Z')?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .map(|parsed| parsed.and_utc())
}

fn parse_object(raw: &str, payload: Payload) -> Result<Document> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => json_object_to_document(map, payload),
        _ => Err(payload.invalid()),
    }
}

/// Plain JSON to BSON. Keys starting with `$` stay literal, so extended
/// JSON such as `{"$date": ...}` is stored as a sub-document, not a date.
fn json_object_to_document(map: Map<String, Value>, payload: Payload) -> Result<Document> {
    map.into_iter()
        .map(|(key, value)| Ok((key, json_to_bson(value, payload)?)))
        .collect()
}

fn json_to_bson(value: Value, payload: Payload) -> Result<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i32::try_from(i).map_or(Bson::Int64(i), Bson::Int32),
            (None, Some(f)) if n.is_f64() => Bson::Double(f),
            // unsigned beyond i64 has no BSON integer type
            _ => return Err(payload.invalid()),
        },
        Value::String(text) => Bson::String(text),
        Value::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| json_to_bson(item, payload))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Bson::Document(json_object_to_document(map, payload)?),
    })
}
