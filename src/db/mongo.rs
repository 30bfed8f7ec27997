//! MongoDB client and collection wrapper
//!
//! Pattern adapted from doorway/src/db/mongo.rs

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::types::TsundokuError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, TsundokuError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| TsundokuError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TsundokuError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, TsundokuError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, TsundokuError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), TsundokuError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| TsundokuError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    pub async fn insert_one(&self, item: &T) -> Result<(), TsundokuError> {
        self.inner
            .insert_one(item)
            .await
            .map_err(|e| TsundokuError::Database(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TsundokuError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| TsundokuError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter.
    ///
    /// Documents that fail to decode are logged and skipped. The cursor
    /// reports exhaustion as `Ok(None)`.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, TsundokuError> {
        let mut cursor = self
            .inner
            .clone_with_type::<Document>()
            .find(filter)
            .await
            .map_err(|e| TsundokuError::Database(format!("Find failed: {}", e)))?;

        let mut results = Vec::new();
        while let Some(raw) = cursor
            .try_next()
            .await
            .map_err(|e| TsundokuError::Database(format!("Cursor failed: {}", e)))?
        {
            let id = raw.get("_id").map(|v| v.to_string()).unwrap_or_default();
            match bson::from_document::<T>(raw) {
                Ok(item) => results.push(item),
                Err(e) => warn!(id = %id, error = %e, "Skipping undecodable document"),
            }
        }

        Ok(results)
    }

    /// Replace one document; returns whether a document matched
    pub async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, TsundokuError> {
        let result = self
            .inner
            .replace_one(filter, item)
            .await
            .map_err(|e| TsundokuError::Database(format!("Replace failed: {}", e)))?;
        Ok(result.matched_count > 0)
    }

    /// Update one document; returns whether a document matched
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<bool, TsundokuError> {
        let result = self
            .inner
            .update_one(filter, update)
            .await
            .map_err(|e| TsundokuError::Database(format!("Update failed: {}", e)))?;
        Ok(result.matched_count > 0)
    }

    /// Update one document, inserting it when nothing matches
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<(), TsundokuError> {
        self.inner
            .update_one(filter, update)
            .upsert(true)
            .await
            .map_err(|e| TsundokuError::Database(format!("Upsert failed: {}", e)))?;
        Ok(())
    }

    /// Delete one document; returns whether a document was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, TsundokuError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| TsundokuError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }
}
