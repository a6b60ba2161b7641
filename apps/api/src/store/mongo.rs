use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{Collation, CollationStrength, FindOneOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde_json::{Map, Value};
use tracing::info;

use super::{CustomerStore, JobStore, StoreError, UpdateOutcome};
use crate::models::job::{IndustryCount, Job, JobField};

/// MongoDB-backed store. The client pools connections internally, so one
/// instance is shared by every request for the life of the process.
pub struct MongoStore {
    jobs: Collection<Job>,
    raw_jobs: Collection<Document>,
    customers: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(
        uri: &str,
        database: &str,
        jobs_collection: &str,
        customers_collection: &str,
    ) -> anyhow::Result<Self> {
        info!("Connecting to MongoDB...");

        let client = Client::with_uri_str(uri).await?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;

        let db = client.database(database);
        let store = MongoStore {
            jobs: db.collection(jobs_collection),
            raw_jobs: db.collection(jobs_collection),
            customers: db.collection(customers_collection),
        };

        store
            .jobs
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "job_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;

        info!("MongoDB connection established (database: {database})");
        Ok(store)
    }
}

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Attempts at picking a fresh `job_id` before giving up under contention.
const ASSIGN_ATTEMPTS: usize = 8;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == DUPLICATE_KEY
    )
}

/// Locale-aware comparison at secondary strength: case is ignored, base
/// letters and accents are not.
pub fn case_insensitive() -> Collation {
    Collation::builder()
        .locale("en".to_string())
        .strength(CollationStrength::Secondary)
        .build()
}

fn by_job_id() -> Document {
    doc! { "job_id": 1 }
}

pub fn field_filter(field: JobField, term: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(field.path(), term);
    filter
}

/// One condition per skill, joined with `$and`.
pub fn all_skills_filter(skills: &[String]) -> Document {
    let conditions: Vec<Document> = skills
        .iter()
        .map(|s| field_filter(JobField::Skill, s))
        .collect();
    doc! { "$and": conditions }
}

pub fn salary_filter(min: i64, max: i64) -> Document {
    doc! { "average_salary": { "$gte": min, "$lte": max } }
}

pub fn industry_count_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$industry.name", "job_count": { "$sum": 1 } } },
        doc! { "$sort": { "job_count": -1, "_id": 1 } },
        doc! { "$project": { "_id": 0, "industry": "$_id", "job_count": 1 } },
    ]
}

pub fn top_paid_sort() -> Document {
    doc! { "average_salary": -1, "job_id": 1 }
}

pub fn birthdate_filter(start: DateTime, end: DateTime, active: Option<bool>) -> Document {
    let mut filter = doc! { "birthdate": { "$gte": start, "$lte": end } };
    if let Some(flag) = active {
        filter.insert("active", flag);
    }
    filter
}

impl MongoStore {
    async fn find_jobs(
        &self,
        filter: Document,
        collation: Option<Collation>,
    ) -> Result<Vec<Job>, StoreError> {
        let options = FindOptions::builder()
            .sort(by_job_id())
            .collation(collation)
            .build();
        let cursor = self.jobs.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl JobStore for MongoStore {
    async fn insert(&self, job: &Job) -> Result<ObjectId, StoreError> {
        let result = match self.jobs.insert_one(job, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => return Err(StoreError::DuplicateJobId(job.job_id)),
            Err(e) => return Err(e.into()),
        };
        result
            .inserted_id
            .as_object_id()
            .ok_or(StoreError::MissingInsertedId)
    }

    async fn insert_new(
        &self,
        mut job: Job,
        requested: Option<i64>,
    ) -> Result<(ObjectId, i64), StoreError> {
        if let Some(job_id) = requested {
            job.job_id = job_id;
            return Ok((self.insert(&job).await?, job_id));
        }

        // The unique index arbitrates concurrent creates; a loser re-reads the
        // maximum and tries again.
        let mut last = 0;
        for _ in 0..ASSIGN_ATTEMPTS {
            job.job_id = self.max_job_id().await?.map_or(1, |max| max + 1);
            last = job.job_id;
            match self.insert(&job).await {
                Ok(id) => return Ok((id, job.job_id)),
                Err(StoreError::DuplicateJobId(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::DuplicateJobId(last))
    }

    async fn max_job_id(&self) -> Result<Option<i64>, StoreError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "job_id": -1 })
            .build();
        Ok(self
            .jobs
            .find_one(doc! {}, options)
            .await?
            .map(|j| j.job_id))
    }

    async fn find_by_job_id(&self, job_id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.find_one(doc! { "job_id": job_id }, None).await?)
    }

    async fn find_by_field(&self, field: JobField, term: &str) -> Result<Vec<Job>, StoreError> {
        self.find_jobs(field_filter(field, term), Some(case_insensitive()))
            .await
    }

    async fn find_with_all_skills(&self, skills: &[String]) -> Result<Vec<Job>, StoreError> {
        self.find_jobs(all_skills_filter(skills), Some(case_insensitive()))
            .await
    }

    async fn find_by_salary_range(&self, min: i64, max: i64) -> Result<Vec<Job>, StoreError> {
        self.find_jobs(salary_filter(min, max), None).await
    }

    async fn count_by_industry(&self) -> Result<Vec<IndustryCount>, StoreError> {
        let cursor = self
            .raw_jobs
            .aggregate(industry_count_pipeline(), None)
            .await?;
        let rows: Vec<Document> = cursor.try_collect().await?;
        rows.into_iter()
            .map(|row| bson::from_document(row).map_err(StoreError::from))
            .collect()
    }

    async fn top_paid(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let options = FindOptions::builder()
            .sort(top_paid_sort())
            .limit(limit)
            .build();
        let cursor = self.jobs.find(doc! {}, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn distinct_companies(&self) -> Result<Vec<String>, StoreError> {
        let values = self.jobs.distinct("company.name", None, None).await?;
        let mut names: Vec<String> = values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn update_fields(
        &self,
        job_id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        let set = bson::to_document(fields)?;
        let result = self
            .jobs
            .update_one(doc! { "job_id": job_id }, doc! { "$set": set }, None)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_by_job_id(&self, job_id: i64) -> Result<u64, StoreError> {
        let result = self.jobs.delete_one(doc! { "job_id": job_id }, None).await?;
        Ok(result.deleted_count)
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let result = self.jobs.delete_many(doc! {}, None).await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl CustomerStore for MongoStore {
    async fn find_matching(&self, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self.customers.find(filter.clone(), None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Document>, StoreError> {
        Ok(self.customers.find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<ObjectId>, StoreError> {
        let result = self.customers.insert_many(docs, None).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(idx, _)| *idx);
        ids.into_iter()
            .map(|(_, id)| id.as_object_id().ok_or(StoreError::MissingInsertedId))
            .collect()
    }

    async fn insert_one(&self, doc: Document) -> Result<ObjectId, StoreError> {
        let result = self.customers.insert_one(doc, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or(StoreError::MissingInsertedId)
    }

    async fn update_by_username(
        &self,
        username: &str,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .customers
            .update_one(doc! { "username": username }, update, None)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError> {
        let result = self
            .customers
            .delete_one(doc! { "username": username }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn find_by_birthdate(
        &self,
        start: DateTime,
        end: DateTime,
        active: Option<bool>,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .customers
            .find(birthdate_filter(start, end, active), None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_filter_uses_dotted_path() {
        assert_eq!(
            field_filter(JobField::Industry, "Finance"),
            doc! { "industry.name": "Finance" }
        );
        assert_eq!(
            field_filter(JobField::Degree, "phd"),
            doc! { "education_required.level": "phd" }
        );
    }

    #[test]
    fn test_all_skills_filter_is_conjunction_of_single_conditions() {
        let skills = vec!["Python".to_string(), "SQL".to_string()];
        assert_eq!(
            all_skills_filter(&skills),
            doc! { "$and": [
                { "skills_required": "Python" },
                { "skills_required": "SQL" },
            ] }
        );
    }

    #[test]
    fn test_salary_filter_is_closed_interval() {
        assert_eq!(
            salary_filter(80_000, 120_000),
            doc! { "average_salary": { "$gte": 80_000_i64, "$lte": 120_000_i64 } }
        );
    }

    #[test]
    fn test_top_paid_sort_breaks_ties_by_job_id() {
        let sort = top_paid_sort();
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["average_salary", "job_id"]);
        assert_eq!(sort.get_i32("job_id").unwrap(), 1);
    }

    #[test]
    fn test_industry_pipeline_stages() {
        let stages: Vec<String> = industry_count_pipeline()
            .iter()
            .filter_map(|s| s.keys().next().cloned())
            .collect();
        assert_eq!(stages, vec!["$group", "$sort", "$project"]);
    }

    #[test]
    fn test_birthdate_filter_active_optional() {
        let start = DateTime::from_millis(0);
        let end = DateTime::from_millis(1_000);
        assert!(!birthdate_filter(start, end, None).contains_key("active"));
        assert!(birthdate_filter(start, end, Some(true))
            .get_bool("active")
            .unwrap());
    }

    #[test]
    fn test_collation_strength() {
        let c = case_insensitive();
        assert_eq!(c.locale, "en");
        assert!(matches!(c.strength, Some(CollationStrength::Secondary)));
    }
}
