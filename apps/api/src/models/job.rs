use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A denormalized job posting as stored in the `jobs` collection.
///
/// `company`, `industry` and `education_required` are embedded copies frozen at
/// creation time; nothing links them back to a canonical record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub job_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
    pub company: Company,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_required: Option<EducationRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_salary: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_posting_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Company {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Industry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_companies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DegreeLevel {
    Diploma,
    Bachelors,
    Masters,
    PhD,
    Other,
}

impl DegreeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegreeLevel::Diploma => "Diploma",
            DegreeLevel::Bachelors => "Bachelors",
            DegreeLevel::Masters => "Masters",
            DegreeLevel::PhD => "PhD",
            DegreeLevel::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EducationRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<DegreeLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// One row of the jobs-per-industry aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustryCount {
    pub industry: Option<String>,
    pub job_count: i64,
}

/// Embedded fields that support case-insensitive exact-match lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobField {
    Industry,
    Company,
    Degree,
    Skill,
    Experience,
    Location,
}

impl JobField {
    /// Dotted document path queried in the store.
    pub fn path(&self) -> &'static str {
        match self {
            JobField::Industry => "industry.name",
            JobField::Company => "company.name",
            JobField::Degree => "education_required.level",
            JobField::Skill => "skills_required",
            JobField::Experience => "experience_level",
            JobField::Location => "location",
        }
    }
}

impl Job {
    /// Values stored under `field`, flattened to strings.
    pub fn field_values(&self, field: JobField) -> Vec<&str> {
        match field {
            JobField::Industry => self.industry.iter().map(|i| i.name.as_str()).collect(),
            JobField::Company => vec![self.company.name.as_str()],
            JobField::Degree => self
                .education_required
                .as_ref()
                .and_then(|e| e.level)
                .map(|l| vec![l.as_str()])
                .unwrap_or_default(),
            JobField::Skill => self
                .skills_required
                .iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            JobField::Experience => self.experience_level.as_deref().into_iter().collect(),
            JobField::Location => self.location.as_deref().into_iter().collect(),
        }
    }

    /// Case-insensitive exact match against any value stored under `field`.
    pub fn matches(&self, field: JobField, term: &str) -> bool {
        let term = term.to_lowercase();
        self.field_values(field)
            .into_iter()
            .any(|v| v.to_lowercase() == term)
    }
}

/// Client-facing rendering of a [`Job`]: the store identifier is exposed as
/// its hex string, never as an extended-JSON object.
#[derive(Debug, Serialize)]
pub struct JobView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub job: Job,
}

impl From<Job> for JobView {
    fn from(mut job: Job) -> Self {
        let id = job.id.take().map(|oid| oid.to_hex());
        JobView { id, job }
    }
}

/// Buckets a `"start-end"` years-of-experience range by its leading number.
/// Anything unparsable lands in the middle bucket.
pub fn derive_experience_level(years_of_experience: &str) -> &'static str {
    let start = years_of_experience
        .split('-')
        .next()
        .map(str::trim)
        .and_then(|s| s.parse::<i64>().ok());

    match start {
        Some(n) if n <= 2 => "Entry Level",
        Some(n) if n >= 6 => "Senior Level",
        _ => "Mid Level",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        serde_json::from_value(json!({
            "job_id": 7,
            "title": "Data Analyst",
            "company": { "name": "Acme", "type": "Private" },
            "industry": { "name": "Finance" },
            "education_required": { "level": "Bachelors", "field": "Statistics" },
            "skills_required": ["Python", "SQL"],
            "experience_level": "Mid Level",
            "location": "Toronto"
        }))
        .unwrap()
    }

    #[test]
    fn test_experience_level_entry() {
        assert_eq!(derive_experience_level("0-2"), "Entry Level");
        assert_eq!(derive_experience_level("2-4"), "Entry Level");
    }

    #[test]
    fn test_experience_level_mid() {
        assert_eq!(derive_experience_level("3-5"), "Mid Level");
        assert_eq!(derive_experience_level("5-7"), "Mid Level");
    }

    #[test]
    fn test_experience_level_senior() {
        assert_eq!(derive_experience_level("6-10"), "Senior Level");
        assert_eq!(derive_experience_level(" 8 - 12"), "Senior Level");
    }

    #[test]
    fn test_experience_level_unparsable() {
        assert_eq!(derive_experience_level("several"), "Mid Level");
        assert_eq!(derive_experience_level(""), "Mid Level");
    }

    #[test]
    fn test_company_type_renamed() {
        let j = job();
        assert_eq!(j.company.kind.as_deref(), Some("Private"));
        let v = serde_json::to_value(&j).unwrap();
        assert_eq!(v["company"]["type"], "Private");
    }

    #[test]
    fn test_matches_ignores_case() {
        let j = job();
        assert!(j.matches(JobField::Industry, "finance"));
        assert!(j.matches(JobField::Company, "ACME"));
        assert!(j.matches(JobField::Degree, "bachelors"));
        assert!(j.matches(JobField::Skill, "sql"));
        assert!(j.matches(JobField::Experience, "mid level"));
        assert!(j.matches(JobField::Location, "toronto"));
        assert!(!j.matches(JobField::Skill, "Excel"));
    }

    #[test]
    fn test_matches_is_exact_not_substring() {
        assert!(!job().matches(JobField::Industry, "Fin"));
    }

    #[test]
    fn test_view_stringifies_id() {
        let mut j = job();
        let oid = ObjectId::new();
        j.id = Some(oid);
        let v = serde_json::to_value(JobView::from(j)).unwrap();
        assert_eq!(v["_id"], oid.to_hex());
        assert_eq!(v["job_id"], 7);
        assert!(v.get("description").is_none());
    }
}
