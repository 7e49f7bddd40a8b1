//! MongoDB client and typed collections
//!
//! A `MongoCollection<T>` applies the indexes `T` declares when it is opened
//! and stamps `T`'s metadata on every write.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::db::schemas::Metadata;
use crate::types::HabitError;

/// Fail fast when the server is unreachable instead of hanging startup
const SELECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// Schemas that declare their own indexes
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Schemas carrying a `Metadata` block
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Bound shared by every stored document type
pub trait Stored:
    Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata
{
}

impl<T> Stored for T where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata
{
}

fn db_err(op: &'static str) -> impl Fn(mongodb::error::Error) -> HabitError {
    move |e| HabitError::Database(format!("{} failed: {}", op, e))
}

/// Connected client bound to one database
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping. Errors if the server cannot be reached in time.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, HabitError> {
        info!("Connecting to MongoDB database '{}'", db_name);

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| HabitError::Config(format!("Invalid MONGODB_URI: {}", e)))?;
        options.app_name = Some("habitracked".into());
        options.server_selection_timeout = Some(SELECTION_TIMEOUT);
        options.connect_timeout = Some(SELECTION_TIMEOUT);

        let client = Client::with_options(options).map_err(db_err("MongoDB client setup"))?;
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(db_err("MongoDB ping"))?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Open a typed collection, creating its indexes if needed
    pub async fn collection<T: Stored>(&self, name: &str) -> Result<MongoCollection<T>, HabitError> {
        let inner = self.client.database(&self.db_name).collection::<T>(name);

        let indexes: Vec<IndexModel> = T::into_indices()
            .into_iter()
            .map(|(keys, options)| IndexModel::builder().keys(keys).options(options).build())
            .collect();
        if !indexes.is_empty() {
            inner
                .create_indexes(indexes)
                .await
                .map_err(db_err("Index creation"))?;
            debug!(collection = name, "Indexes applied");
        }

        Ok(MongoCollection { inner })
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed collection handle
#[derive(Debug)]
pub struct MongoCollection<T: Send + Sync> {
    inner: Collection<T>,
}

impl<T: Send + Sync> Clone for MongoCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Stored> MongoCollection<T> {
    /// Insert with fresh created/updated stamps. A unique index clash is a `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, HabitError> {
        *item.mut_metadata() = Metadata::new();

        let result = self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                HabitError::Conflict("Document already exists".into())
            } else {
                db_err("Insert")(e)
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| HabitError::Database("Inserted id is not an ObjectId".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, HabitError> {
        self.inner.find_one(filter).await.map_err(db_err("Find"))
    }

    /// All matches, in `sort` order when given
    pub async fn find_many(&self, filter: Document, sort: Option<Document>) -> Result<Vec<T>, HabitError> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        find.await
            .map_err(db_err("Find"))?
            .try_collect()
            .await
            .map_err(db_err("Cursor read"))
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult, HabitError> {
        self.inner
            .update_one(filter, update)
            .await
            .map_err(db_err("Update"))
    }

    /// Apply `update` (stamping `metadata.updated_at`) and return the new document
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        mut update: Document,
    ) -> Result<Option<T>, HabitError> {
        let mut set = match update.remove("$set") {
            Some(bson::Bson::Document(set)) => set,
            _ => Document::new(),
        };
        set.insert("metadata.updated_at", DateTime::now());
        update.insert("$set", set);

        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(db_err("Update"))
    }

    /// Hard delete
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult, HabitError> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(db_err("Delete"))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
