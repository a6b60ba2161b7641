//! Storage seam. Handlers only see the [`JobStore`] and [`CustomerStore`]
//! traits; the composition root picks MongoDB or the in-process backend.

pub mod memory;
pub mod mongo;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, DateTime, Document};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::models::job::{IndustryCount, Job, JobField};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON serialization error: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("BSON deserialization error: {0}")]
    Deserialize(#[from] bson::de::Error),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported update operator: {0}")]
    UnsupportedUpdate(String),

    #[error("A job with job_id {0} already exists")]
    DuplicateJobId(i64),

    #[error("Store did not return an inserted id")]
    MissingInsertedId,
}

/// Result of a single-document update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Operations on the job collection. Every list result is ordered by `job_id`
/// unless the operation defines its own order.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores `job` as-is. Fails with [`StoreError::DuplicateJobId`] if its
    /// `job_id` is taken.
    async fn insert(&self, job: &Job) -> Result<ObjectId, StoreError>;

    /// Stores a new job under `requested`, or under one past the current
    /// maximum when `None`. Assignment and insert are atomic with respect to
    /// other creates. Returns the store id and the `job_id` used.
    async fn insert_new(
        &self,
        job: Job,
        requested: Option<i64>,
    ) -> Result<(ObjectId, i64), StoreError>;

    /// Highest `job_id` currently stored.
    async fn max_job_id(&self) -> Result<Option<i64>, StoreError>;

    async fn find_by_job_id(&self, job_id: i64) -> Result<Option<Job>, StoreError>;

    /// Case-insensitive exact match on an embedded field.
    async fn find_by_field(&self, field: JobField, term: &str) -> Result<Vec<Job>, StoreError>;

    /// Jobs whose `skills_required` contains every listed skill, ignoring case.
    async fn find_with_all_skills(&self, skills: &[String]) -> Result<Vec<Job>, StoreError>;

    /// Jobs with `average_salary` in the closed interval `[min, max]`.
    async fn find_by_salary_range(&self, min: i64, max: i64) -> Result<Vec<Job>, StoreError>;

    /// Job counts per industry name, largest first.
    async fn count_by_industry(&self) -> Result<Vec<IndustryCount>, StoreError>;

    /// Highest-paid jobs, ties broken by ascending `job_id`.
    async fn top_paid(&self, limit: i64) -> Result<Vec<Job>, StoreError>;

    /// Sorted distinct `company.name` values.
    async fn distinct_companies(&self) -> Result<Vec<String>, StoreError>;

    /// Merges `fields` into the job with `$set` semantics.
    async fn update_fields(
        &self,
        job_id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_job_id(&self, job_id: i64) -> Result<u64, StoreError>;

    /// Removes every job. Used by `seed --replace`.
    async fn clear(&self) -> Result<u64, StoreError>;
}

/// Operations on the schemaless customer collection.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_matching(&self, filter: &Document) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Document>, StoreError>;

    /// Returns ids in input order.
    async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<ObjectId>, StoreError>;

    async fn insert_one(&self, doc: Document) -> Result<ObjectId, StoreError>;

    async fn update_by_username(
        &self,
        username: &str,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError>;

    /// Customers born in `[start, end]`, optionally filtered on `active`.
    async fn find_by_birthdate(
        &self,
        start: DateTime,
        end: DateTime,
        active: Option<bool>,
    ) -> Result<Vec<Document>, StoreError>;
}

/// Store handles injected into [`crate::state::AppState`].
pub struct Stores {
    pub jobs: Arc<dyn JobStore>,
    pub customers: Arc<dyn CustomerStore>,
}

/// Builds the configured backend.
pub async fn connect(config: &Config) -> Result<Stores> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let store = Arc::new(
                mongo::MongoStore::connect(
                    &config.mongodb_uri,
                    &config.database_name,
                    &config.jobs_collection,
                    &config.customers_collection,
                )
                .await?,
            );
            Ok(Stores {
                jobs: store.clone(),
                customers: store,
            })
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            let store = Arc::new(memory::MemoryStore::default());
            Ok(Stores {
                jobs: store.clone(),
                customers: store,
            })
        }
    }
}
