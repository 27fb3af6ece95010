//! In-memory document store used by the integration tests
//!
//! Supports top-level equality filters, `$set` updates (as an operator
//! document or as pipeline stages) and `$match` aggregation stages, which
//! is all the tests exercise.

#![allow(dead_code)]

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use mongodb_mcp::normalize::Update;
use mongodb_mcp::{Dispatcher, DocumentStore, McpError, Result, ToolRegistry, UpdateSummary};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, collection: &str, documents: Vec<Document>) {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();
        for document in documents {
            stored.push(with_id(document));
        }
    }

    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut stored = doc! { "_id": ObjectId::new() };
    for (key, value) in document {
        stored.insert(key, value);
    }
    stored
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn find(&self, collection: &str, filter: Document, limit: i64) -> Result<Vec<Document>> {
        let found = self
            .documents(collection)
            .await
            .into_iter()
            .filter(|document| matches(document, &filter));
        Ok(if limit > 0 {
            found.take(limit as usize).collect()
        } else {
            found.collect()
        })
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
        let document = with_id(document);
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn update_many(&self, collection: &str, filter: Document, update: Update) -> Result<UpdateSummary> {
        let stages = match update {
            Update::Modifiers(modifiers) => vec![modifiers],
            Update::Pipeline(stages) => stages,
        };
        let mut set = Document::new();
        for stage in &stages {
            let fields = stage
                .get_document("$set")
                .map_err(|_| McpError::Database("only $set updates are supported".into()))?;
            for (key, value) in fields {
                set.insert(key.clone(), value.clone());
            }
        }

        let mut summary = UpdateSummary::default();
        let mut collections = self.collections.write().await;
        for document in collections.entry(collection.to_string()).or_default() {
            if !matches(document, &filter) {
                continue;
            }
            summary.matched_count += 1;
            let mut modified = false;
            for (key, value) in &set {
                if document.get(key) != Some(value) {
                    document.insert(key.clone(), value.clone());
                    modified = true;
                }
            }
            if modified {
                summary.modified_count += 1;
            }
        }
        Ok(summary)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();
        let before = stored.len();
        stored.retain(|document| !matches(document, &filter));
        Ok((before - stored.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        Ok(self
            .documents(collection)
            .await
            .iter()
            .filter(|document| matches(document, &filter))
            .count() as u64)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let mut documents = self.documents(collection).await;
        for stage in pipeline {
            match stage.get_document("$match") {
                Ok(filter) => documents.retain(|document| matches(document, filter)),
                Err(_) => return Err(McpError::Database(format!("unsupported stage: {}", stage))),
            }
        }
        Ok(documents)
    }
}

/// Dispatcher over a fresh store
pub fn dispatcher(store: Arc<MemoryStore>) -> Dispatcher {
    Dispatcher::new(Arc::new(ToolRegistry::new(store)))
}

/// Store seeded with a small hospital data set
pub async fn hospital() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            "Doctors",
            vec![
                doc! { "Name": "Dr Samia", "Specialization": "Dentistry", "Day": "Wednesday" },
                doc! { "Name": "Dr Bilal", "Specialization": "Dentistry", "Day": "Monday" },
                doc! { "Name": "Dr Hina", "Specialization": "Dentistry", "Day": "Friday" },
                doc! { "Name": "Dr Omar", "Specialization": "Cardiology", "Day": "Monday" },
            ],
        )
        .await;
    store
        .seed("Patients", vec![doc! { "Name": "Ayesha", "Problem": "Toothache" }])
        .await;
    store
}
