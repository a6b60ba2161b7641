//! Bulk loading of denormalized job documents.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::models::job::{derive_experience_level, Job};
use crate::store::JobStore;

/// Parses a JSON array of job documents, filling in `experience_level` from
/// `years_of_experience` where it is missing.
pub fn parse_jobs(raw: &str) -> Result<Vec<Job>> {
    let docs: Vec<Value> = serde_json::from_str(raw).context("seed file must be a JSON array")?;

    docs.into_iter()
        .enumerate()
        .map(|(idx, mut doc)| {
            let Some(fields) = doc.as_object_mut() else {
                bail!("document {idx} is not an object");
            };
            if !fields.contains_key("experience_level") {
                if let Some(years) = fields.get("years_of_experience").and_then(Value::as_str) {
                    let level = derive_experience_level(years);
                    fields.insert("experience_level".to_string(), Value::from(level));
                }
            }
            serde_json::from_value(doc).with_context(|| format!("document {idx} is not a valid job"))
        })
        .collect()
}

pub async fn load_file(path: &Path) -> Result<Vec<Job>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_jobs(&raw)
}

/// Inserts `jobs`, optionally clearing the collection first. Returns the
/// number inserted.
pub async fn seed_jobs(store: &dyn JobStore, jobs: Vec<Job>, replace: bool) -> Result<usize> {
    if replace {
        let removed = store.clear().await?;
        warn!("Removed {removed} existing jobs");
    }

    let mut inserted = 0;
    for job in &jobs {
        store
            .insert(job)
            .await
            .with_context(|| format!("failed to insert job {}", job.job_id))?;
        inserted += 1;
    }

    info!("Seeded {inserted} jobs");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::io::Write;

    const SEED: &str = r#"[
        {
            "job_id": 1,
            "title": "Analyst",
            "company": { "name": "Acme" },
            "years_of_experience": "0-2",
            "average_salary": 60000
        },
        {
            "job_id": 2,
            "title": "Architect",
            "company": { "name": "Globex" },
            "years_of_experience": "8-12",
            "experience_level": "Principal"
        }
    ]"#;

    #[test]
    fn test_parse_derives_missing_experience_level() {
        let jobs = parse_jobs(SEED).unwrap();
        assert_eq!(jobs[0].experience_level.as_deref(), Some("Entry Level"));
        assert_eq!(jobs[1].experience_level.as_deref(), Some("Principal"));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        let err = parse_jobs("[1]").unwrap_err();
        assert!(err.to_string().contains("document 0"));
    }

    #[test]
    fn test_parse_rejects_invalid_job() {
        assert!(parse_jobs(r#"[{ "job_id": 1 }]"#).is_err());
    }

    #[tokio::test]
    async fn test_seed_from_file_with_replace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let store = MemoryStore::default();
        let jobs = load_file(file.path()).await.unwrap();
        assert_eq!(seed_jobs(&store, jobs.clone(), false).await.unwrap(), 2);
        assert_eq!(seed_jobs(&store, jobs, true).await.unwrap(), 2);
        assert_eq!(store.max_job_id().await.unwrap(), Some(2));
        assert_eq!(store.distinct_companies().await.unwrap(), vec!["Acme", "Globex"]);
    }

    #[tokio::test]
    async fn test_seed_without_replace_refuses_taken_ids() {
        let store = MemoryStore::default();
        let jobs = parse_jobs(SEED).unwrap();
        seed_jobs(&store, jobs.clone(), false).await.unwrap();
        let err = seed_jobs(&store, jobs, false).await.unwrap_err();
        assert!(err.to_string().contains("failed to insert job"), "{err}");
    }
}
