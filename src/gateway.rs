//! Document store gateway
//!
//! Owns the single MongoDB connection for the process lifetime. Tool
//! handlers reach the store only through the [`DocumentStore`] trait.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{options::UpdateModifications, Client, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};
use crate::normalize::Update;

/// Store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// MongoDB connection string
    pub connection_string: String,
    /// Database holding the collections exposed as tools
    pub database: String,
}

impl StoreConfig {
    /// Create a config, rejecting empty values
    pub fn new(connection_string: impl Into<String>, database: impl Into<String>) -> Result<Self> {
        let connection_string = connection_string.into();
        let database = database.into();

        if connection_string.trim().is_empty() {
            return Err(McpError::Config("MongoDB connection string must be set".into()));
        }
        if database.trim().is_empty() {
            return Err(McpError::Config("MongoDB database name must be set".into()));
        }

        Ok(Self {
            connection_string,
            database,
        })
    }
}

/// Counts reported by an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// CRUD capability the tool handlers run against.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn find(&self, collection: &str, filter: Document, limit: i64) -> Result<Vec<Document>>;

    /// Insert one document, returning its identifier
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

    async fn update_many(&self, collection: &str, filter: Document, update: Update) -> Result<UpdateSummary>;

    /// Delete matching documents, returning how many were removed
    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>>;
}

/// MongoDB-backed gateway
pub struct MongoGateway {
    client: Client,
    db: Database,
}

impl MongoGateway {
    /// Connect and verify the server answers a `ping`.
    ///
    /// The driver connects lazily, so the ping is what proves reachability.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.connection_string)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;

        let db = client.database(&config.database);
        tracing::info!("Connected to MongoDB database: {}", config.database);

        Ok(Self { client, db })
    }

    /// Name of the connected database
    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    /// Handle for a collection in the connected database
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    /// Close the connection, waiting for in-use driver resources to be released
    pub async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("MongoDB connection closed");
    }
}

#[async_trait]
impl DocumentStore for MongoGateway {
    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.db.list_collection_names().await?)
    }

    async fn find(&self, collection: &str, filter: Document, limit: i64) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).find(filter).limit(limit).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn update_many(&self, collection: &str, filter: Document, update: Update) -> Result<UpdateSummary> {
        let update = match update {
            Update::Modifiers(modifiers) => UpdateModifications::Document(modifiers),
            Update::Pipeline(stages) => UpdateModifications::Pipeline(stages),
        };
        let result = self.collection(collection).update_many(filter, update).await?;
        Ok(UpdateSummary {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Store whose every call fails as if the connection were lost
    pub(crate) struct UnreachableStore;

    fn refused<T>() -> Result<T> {
        Err(McpError::Database("connection refused".into()))
    }

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn list_collections(&self) -> Result<Vec<String>> {
            refused()
        }
        async fn find(&self, _: &str, _: Document, _: i64) -> Result<Vec<Document>> {
            refused()
        }
        async fn insert_one(&self, _: &str, _: Document) -> Result<Bson> {
            refused()
        }
        async fn update_many(&self, _: &str, _: Document, _: Update) -> Result<UpdateSummary> {
            refused()
        }
        async fn delete_many(&self, _: &str, _: Document) -> Result<u64> {
            refused()
        }
        async fn count(&self, _: &str, _: Document) -> Result<u64> {
            refused()
        }
        async fn aggregate(&self, _: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
            if pipeline.iter().any(|stage| stage.contains_key("$panic")) {
                panic!("aggregation stage exploded");
            }
            refused()
        }
    }
}
