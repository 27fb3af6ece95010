//! MCP tool implementations for MongoDB collections
//!
//! The seven operations are a closed set, so they are an enum rather than
//! a name-keyed map of callables. Each operation knows its advertised
//! schema; [`ToolRegistry::execute`] validates against that same schema
//! before running the handler.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::{McpError, Result};
use crate::gateway::DocumentStore;
use crate::normalize::{self, Payload};
use crate::protocol::{InputSchema, PropertySchema, Tool};

/// Default page size for `find_documents`
pub const DEFAULT_LIMIT: i64 = 10;

/// A tool operation offered to the calling agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCollections,
    FindDocuments,
    InsertDocument,
    UpdateDocuments,
    DeleteDocuments,
    CountDocuments,
    Aggregate,
}

impl Operation {
    /// All operations, in advertised order
    pub const ALL: [Operation; 7] = [
        Operation::ListCollections,
        Operation::FindDocuments,
        Operation::InsertDocument,
        Operation::UpdateDocuments,
        Operation::DeleteDocuments,
        Operation::CountDocuments,
        Operation::Aggregate,
    ];

    /// Look up an operation by its tool name
    pub fn resolve(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ListCollections => "list_collections",
            Self::FindDocuments => "find_documents",
            Self::InsertDocument => "insert_document",
            Self::UpdateDocuments => "update_documents",
            Self::DeleteDocuments => "delete_documents",
            Self::CountDocuments => "count_documents",
            Self::Aggregate => "aggregate",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ListCollections => "List all collections in the MongoDB database",
            Self::FindDocuments => "Find documents in a MongoDB collection based on a query",
            Self::InsertDocument => "Insert a document into a MongoDB collection",
            Self::UpdateDocuments => "Update documents in a MongoDB collection",
            Self::DeleteDocuments => "Delete documents from a MongoDB collection",
            Self::CountDocuments => "Count documents in a MongoDB collection based on a query",
            Self::Aggregate => "Perform aggregation operations on a MongoDB collection",
        }
    }

    /// Input schema, used both for `tools/list` and for argument validation
    pub fn input_schema(self) -> InputSchema {
        match self {
            Self::ListCollections => InputSchema::object(),
            Self::FindDocuments => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to search in"),
                )
                .with_property(
                    "query",
                    PropertySchema::string("MongoDB query as a JSON string").with_default(json!("{}")),
                )
                .with_property(
                    "limit",
                    PropertySchema::integer("Maximum number of documents to return")
                        .with_default(json!(DEFAULT_LIMIT)),
                ),
            Self::InsertDocument => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to insert into"),
                )
                .with_required(
                    "document",
                    PropertySchema::string("Document to insert as JSON string"),
                ),
            Self::UpdateDocuments => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to update"),
                )
                .with_required(
                    "query",
                    PropertySchema::string("MongoDB query to match documents as a JSON string"),
                )
                .with_required(
                    "update",
                    PropertySchema::string(
                        "Update operations as a JSON string (use MongoDB update operators like $set, $inc, etc.)",
                    ),
                ),
            Self::DeleteDocuments => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to delete from"),
                )
                .with_required(
                    "query",
                    PropertySchema::string("MongoDB query to match documents to delete as a JSON string"),
                ),
            Self::CountDocuments => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to count documents in"),
                )
                .with_property(
                    "query",
                    PropertySchema::string("MongoDB query as a JSON string").with_default(json!("{}")),
                ),
            Self::Aggregate => InputSchema::object()
                .with_required(
                    "collection_name",
                    PropertySchema::string("Name of the collection to perform aggregation on"),
                )
                .with_required(
                    "pipeline",
                    PropertySchema::string("Aggregation pipeline as JSON string (list of aggregation stages)"),
                ),
        }
    }
}

/// Project an operation into its `tools/list` entry
pub fn export(op: Operation) -> Tool {
    Tool {
        name: op.name().to_string(),
        description: op.description().to_string(),
        input_schema: op.input_schema(),
    }
}

#[derive(Debug, Deserialize)]
struct FindArgs {
    collection_name: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InsertArgs {
    collection_name: String,
    document: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    collection_name: String,
    query: String,
    update: String,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    collection_name: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct CountArgs {
    collection_name: String,
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregateArgs {
    collection_name: String,
    pipeline: String,
}

/// Tool registry bound to a document store
pub struct ToolRegistry {
    store: Arc<dyn DocumentStore>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Registered operations, in advertised order
    pub fn operations(&self) -> &'static [Operation] {
        &Operation::ALL
    }

    /// Get all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        self.operations().iter().copied().map(export).collect()
    }

    /// Execute an operation.
    ///
    /// Arguments that do not satisfy the advertised schema are an `Err`.
    /// Bad payloads and store faults are reported inside the returned
    /// object as `{"error": message}`.
    pub async fn execute(&self, op: Operation, args: Map<String, Value>) -> Result<Value> {
        op.input_schema().validate(&args)?;
        tracing::debug!(tool = op.name(), "Executing tool");

        let outcome = match op {
            Operation::ListCollections => self.list_collections().await,
            Operation::FindDocuments => self.find_documents(parse_args(args)?).await,
            Operation::InsertDocument => self.insert_document(parse_args(args)?).await,
            Operation::UpdateDocuments => self.update_documents(parse_args(args)?).await,
            Operation::DeleteDocuments => self.delete_documents(parse_args(args)?).await,
            Operation::CountDocuments => self.count_documents(parse_args(args)?).await,
            Operation::Aggregate => self.aggregate(parse_args(args)?).await,
        };

        match outcome {
            Err(e) if e.is_domain_error() => {
                tracing::warn!(tool = op.name(), error = %e, "Tool reported an error");
                Ok(json!({ "error": e.to_string() }))
            }
            other => other,
        }
    }

    // Tool implementations

    async fn list_collections(&self) -> Result<Value> {
        match self.store.list_collections().await {
            Ok(collections) => Ok(json!({ "collections": collections })),
            Err(McpError::Database(e)) => Ok(json!({
                "error": format!("Failed to list collections: {}", e)
            })),
            Err(e) => Err(e),
        }
    }

    async fn find_documents(&self, args: FindArgs) -> Result<Value> {
        let filter = normalize::to_store_query(args.query.as_deref())?;
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT);

        let documents: Vec<Value> = self
            .store
            .find(&args.collection_name, filter, limit)
            .await?
            .into_iter()
            .map(normalize::from_store_document)
            .collect();
        let count = documents.len();

        Ok(json!({ "documents": documents, "count": count }))
    }

    async fn insert_document(&self, args: InsertArgs) -> Result<Value> {
        let document = normalize::to_store_document(&args.document)?;
        let inserted_id = self.store.insert_one(&args.collection_name, document).await?;

        Ok(json!({
            "success": true,
            "inserted_id": normalize::identifier_to_string(inserted_id),
            "message": "Document inserted successfully"
        }))
    }

    async fn update_documents(&self, args: UpdateArgs) -> Result<Value> {
        let filter = normalize::to_required_query(&args.query, Payload::QueryOrUpdate)?;
        let update = normalize::to_store_update(&args.update)?;
        let summary = self
            .store
            .update_many(&args.collection_name, filter, update)
            .await?;

        Ok(json!({
            "success": true,
            "matched_count": summary.matched_count,
            "modified_count": summary.modified_count,
            "message": format!("Updated {} documents", summary.modified_count)
        }))
    }

    async fn delete_documents(&self, args: DeleteArgs) -> Result<Value> {
        let filter = normalize::to_required_query(&args.query, Payload::Query)?;
        let deleted_count = self.store.delete_many(&args.collection_name, filter).await?;

        Ok(json!({
            "success": true,
            "deleted_count": deleted_count,
            "message": format!("Deleted {} documents", deleted_count)
        }))
    }

    async fn count_documents(&self, args: CountArgs) -> Result<Value> {
        let filter = normalize::to_store_query(args.query.as_deref())?;
        let count = self.store.count(&args.collection_name, filter).await?;
        Ok(json!({ "count": count }))
    }

    async fn aggregate(&self, args: AggregateArgs) -> Result<Value> {
        let pipeline = normalize::to_store_pipeline(&args.pipeline)?;

        let results: Vec<Value> = self
            .store
            .aggregate(&args.collection_name, pipeline)
            .await?
            .into_iter()
            .map(normalize::from_store_document)
            .collect();
        let count = results.len();

        Ok(json!({ "results": results, "count": count }))
    }
}

fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| McpError::InvalidArguments(e.to_string()))
}
