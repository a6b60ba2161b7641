use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, DateTime, Document};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{CustomerStore, JobStore, StoreError, UpdateOutcome};
use crate::models::customer::{lookup, loosely_equal};
use crate::models::job::{IndustryCount, Job, JobField};

/// In-process store with the same matching rules as the MongoDB backend.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<Vec<Job>>,
    customers: RwLock<Vec<Document>>,
}

/// Caller holds the write guard, so the uniqueness check and the push are
/// one step.
fn push_unique(jobs: &mut Vec<Job>, mut job: Job) -> Result<ObjectId, StoreError> {
    if jobs.iter().any(|j| j.job_id == job.job_id) {
        return Err(StoreError::DuplicateJobId(job.job_id));
    }
    let id = ObjectId::new();
    job.id = Some(id);
    jobs.push(job);
    Ok(id)
}

fn sorted_by_job_id(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by_key(|j| j.job_id);
    jobs
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, job: &Job) -> Result<ObjectId, StoreError> {
        let mut jobs = self.jobs.write().await;
        push_unique(&mut jobs, job.clone())
    }

    async fn insert_new(
        &self,
        mut job: Job,
        requested: Option<i64>,
    ) -> Result<(ObjectId, i64), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job_id = match requested {
            Some(id) => id,
            None => jobs.iter().map(|j| j.job_id).max().map_or(1, |max| max + 1),
        };
        job.job_id = job_id;
        let id = push_unique(&mut jobs, job)?;
        Ok((id, job_id))
    }

    async fn max_job_id(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.jobs.read().await.iter().map(|j| j.job_id).max())
    }

    async fn find_by_job_id(&self, job_id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .find(|j| j.job_id == job_id)
            .cloned())
    }

    async fn find_by_field(&self, field: JobField, term: &str) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(sorted_by_job_id(
            jobs.iter().filter(|j| j.matches(field, term)).cloned().collect(),
        ))
    }

    async fn find_with_all_skills(&self, skills: &[String]) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(sorted_by_job_id(
            jobs.iter()
                .filter(|j| skills.iter().all(|s| j.matches(JobField::Skill, s)))
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_salary_range(&self, min: i64, max: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(sorted_by_job_id(
            jobs.iter()
                .filter(|j| j.average_salary.is_some_and(|s| (min..=max).contains(&s)))
                .cloned()
                .collect(),
        ))
    }

    async fn count_by_industry(&self) -> Result<Vec<IndustryCount>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut counts: BTreeMap<Option<String>, i64> = BTreeMap::new();
        for job in jobs.iter() {
            *counts
                .entry(job.industry.as_ref().map(|i| i.name.clone()))
                .or_default() += 1;
        }
        let mut rows: Vec<IndustryCount> = counts
            .into_iter()
            .map(|(industry, job_count)| IndustryCount {
                industry,
                job_count,
            })
            .collect();
        rows.sort_by_key(|r| Reverse(r.job_count));
        Ok(rows)
    }

    async fn top_paid(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.jobs.read().await.clone();
        jobs.sort_by_key(|j| (Reverse(j.average_salary), j.job_id));
        jobs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(jobs)
    }

    async fn distinct_companies(&self) -> Result<Vec<String>, StoreError> {
        let jobs = self.jobs.read().await;
        let names: BTreeSet<String> = jobs.iter().map(|j| j.company.name.clone()).collect();
        Ok(names.into_iter().collect())
    }

    async fn update_fields(
        &self,
        job_id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut jobs = self.jobs.write().await;
        let Some(slot) = jobs.iter_mut().find(|j| j.job_id == job_id) else {
            return Ok(UpdateOutcome::default());
        };

        let mut current = slot.clone();
        let id = current.id.take();
        let mut merged = match serde_json::to_value(&current)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
        let mut updated: Job = serde_json::from_value(Value::Object(merged))?;
        updated.id = id;

        let modified = u64::from(updated != *slot);
        *slot = updated;
        Ok(UpdateOutcome {
            matched: 1,
            modified,
        })
    }

    async fn delete_by_job_id(&self, job_id: i64) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.write().await;
        match jobs.iter().position(|j| j.job_id == job_id) {
            Some(idx) => {
                jobs.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.write().await;
        let removed = jobs.len() as u64;
        jobs.clear();
        Ok(removed)
    }
}

fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, wanted)| {
        lookup(doc, key).is_some_and(|stored| loosely_equal(stored, wanted))
    })
}

fn has_username(doc: &Document, username: &str) -> bool {
    doc.get_str("username").is_ok_and(|u| u == username)
}

fn apply_update(doc: &mut Document, update: Document) -> Result<bool, StoreError> {
    let before = doc.clone();
    for (op, args) in update {
        let Bson::Document(args) = args else {
            return Err(StoreError::UnsupportedUpdate(op));
        };
        match op.as_str() {
            "$set" => {
                for (key, value) in args {
                    doc.insert(key, value);
                }
            }
            "$unset" => {
                for key in args.keys() {
                    doc.remove(key);
                }
            }
            _ => return Err(StoreError::UnsupportedUpdate(op)),
        }
    }
    Ok(*doc != before)
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_matching(&self, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Document>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .find(|doc| doc.get_object_id("_id").is_ok_and(|oid| oid == id))
            .cloned())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<ObjectId>, StoreError> {
        let mut customers = self.customers.write().await;
        let mut ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = match doc.get_object_id("_id") {
                Ok(id) => id,
                Err(_) => {
                    let id = ObjectId::new();
                    doc.insert("_id", id);
                    id
                }
            };
            ids.push(id);
            customers.push(doc);
        }
        Ok(ids)
    }

    async fn insert_one(&self, doc: Document) -> Result<ObjectId, StoreError> {
        let ids = self.insert_many(vec![doc]).await?;
        ids.into_iter().next().ok_or(StoreError::MissingInsertedId)
    }

    async fn update_by_username(
        &self,
        username: &str,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut customers = self.customers.write().await;
        let Some(doc) = customers.iter_mut().find(|d| has_username(d, username)) else {
            return Ok(UpdateOutcome::default());
        };
        let changed = apply_update(doc, update)?;
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
        })
    }

    async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError> {
        let mut customers = self.customers.write().await;
        match customers.iter().position(|d| has_username(d, username)) {
            Some(idx) => {
                customers.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_by_birthdate(
        &self,
        start: DateTime,
        end: DateTime,
        active: Option<bool>,
    ) -> Result<Vec<Document>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .filter(|doc| {
                doc.get_datetime("birthdate")
                    .is_ok_and(|b| *b >= start && *b <= end)
            })
            .filter(|doc| match active {
                Some(flag) => doc.get_bool("active").is_ok_and(|a| a == flag),
                None => true,
            })
            .cloned()
            .collect())
    }
}
