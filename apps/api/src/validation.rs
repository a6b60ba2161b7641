//! Declarative request validation for job documents.
//!
//! Every writable field is listed once in [`JOB_FIELDS`] with the JSON shape
//! it must have. Creation layers its required-field checks on top of the same
//! table; partial updates use it as an allow-list.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::job::{Company, EducationRequirement, Industry, Job};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    NonEmptyText,
    Integer,
    Boolean,
    TextList,
    Company,
    Industry,
    Education,
}

impl FieldKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::NonEmptyText => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            FieldKind::Integer => value.is_i64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::Company => {
                parse_object::<Company>(value).is_some_and(|c| !c.name.trim().is_empty())
            }
            FieldKind::Industry => {
                parse_object::<Industry>(value).is_some_and(|i| !i.name.trim().is_empty())
            }
            FieldKind::Education => parse_object::<EducationRequirement>(value).is_some(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::NonEmptyText => "a non-empty string",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::TextList => "an array of strings",
            FieldKind::Company | FieldKind::Industry => "an object with a non-empty name",
            FieldKind::Education => "an object with a valid level (Diploma, Bachelors, Masters, PhD, Other) and field",
        }
    }

    /// Why an embedded object was refused, when serde can say.
    fn detail(&self, value: &Value) -> Option<String> {
        match self {
            FieldKind::Company => object_error::<Company>(value),
            FieldKind::Industry => object_error::<Industry>(value),
            FieldKind::Education => object_error::<EducationRequirement>(value),
            _ => None,
        }
    }
}

/// Deserialization error for an embedded object, e.g. an unknown key.
fn object_error<T: DeserializeOwned>(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value::<T>(value.clone())
        .err()
        .map(|e| e.to_string())
}

fn parse_object<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn rule(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule { name, kind }
}

/// Fields a client may write on a job document.
pub const JOB_FIELDS: &[FieldRule] = &[
    rule("title", FieldKind::NonEmptyText),
    rule("description", FieldKind::Text),
    rule("years_of_experience", FieldKind::Text),
    rule("responsibilities", FieldKind::TextList),
    rule("company", FieldKind::Company),
    rule("industry", FieldKind::Industry),
    rule("education_required", FieldKind::Education),
    rule("skills_required", FieldKind::TextList),
    rule("employment_type", FieldKind::Text),
    rule("average_salary", FieldKind::Integer),
    rule("benefits", FieldKind::TextList),
    rule("remote", FieldKind::Boolean),
    rule("location", FieldKind::Text),
    rule("job_posting_url", FieldKind::Text),
    rule("posting_date", FieldKind::NonEmptyText),
    rule("closing_date", FieldKind::Text),
    rule("experience_level", FieldKind::Text),
];

/// Identity fields. Silently dropped from update bodies.
pub const IMMUTABLE_JOB_FIELDS: &[&str] = &["job_id", "_id"];

pub fn rule_for(name: &str) -> Option<&'static FieldRule> {
    JOB_FIELDS.iter().find(|r| r.name == name)
}

fn check_fields(fields: &Map<String, Value>) -> Result<(), AppError> {
    for (key, value) in fields {
        let rule = rule_for(key)
            .ok_or_else(|| AppError::validation(format!("Field '{key}' is not allowed")))?;
        if !rule.kind.accepts(value) {
            let expected = rule.kind.describe();
            return Err(AppError::validation(match rule.kind.detail(value) {
                Some(detail) => format!("Field '{key}' must be {expected} ({detail})"),
                None => format!("Field '{key}' must be {expected}"),
            }));
        }
    }
    Ok(())
}

fn as_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::validation("Request body must be a JSON object")),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map_or(true, |s| s.trim().is_empty())
}

/// A create request that passed validation but has no `job_id` assigned yet.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub job_id: Option<i64>,
    fields: Map<String, Value>,
}

impl JobDraft {
    pub fn into_job(mut self, job_id: i64) -> Result<Job, AppError> {
        self.fields.insert("job_id".to_string(), Value::from(job_id));
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| AppError::validation(format!("Invalid job document: {e}")))
    }
}

/// Validates a create-job body.
pub fn validate_new_job(body: Value, require_industry: bool) -> Result<JobDraft, AppError> {
    let mut fields = as_object(body)?;
    fields.remove("_id");

    match fields.get("title") {
        None => return Err(AppError::validation("Title is required")),
        Some(t) if is_blank(Some(t)) => {
            return Err(AppError::validation("Title must be a non-empty string"))
        }
        _ => {}
    }

    match fields.get("company") {
        None => return Err(AppError::validation("Company information is required")),
        Some(c) if !c.is_object() => return Err(AppError::validation("Company must be an object")),
        Some(c) if is_blank(c.get("name")) => {
            return Err(AppError::validation("Company name is required"))
        }
        _ => {}
    }

    match fields.get("industry") {
        None if require_industry => {
            return Err(AppError::validation("Industry information is required"))
        }
        Some(i) if !i.is_object() => {
            return Err(AppError::validation("Industry must be an object"))
        }
        Some(i) if is_blank(i.get("name")) => {
            return Err(AppError::validation("Industry name is required"))
        }
        _ => {}
    }

    if is_blank(fields.get("posting_date")) {
        return Err(AppError::validation("Posting date is required"));
    }

    let job_id = match fields.remove("job_id") {
        None => None,
        Some(v) => Some(
            v.as_i64()
                .ok_or_else(|| AppError::validation("job_id must be an integer"))?,
        ),
    };

    check_fields(&fields)?;

    Ok(JobDraft { job_id, fields })
}

/// Validates a partial-update body and returns the fields to apply.
pub fn validate_update(body: Value) -> Result<Map<String, Value>, AppError> {
    let mut fields = as_object(body)?;
    if fields.is_empty() {
        return Err(AppError::validation(
            "Request body must contain at least one field to update",
        ));
    }

    for immutable in IMMUTABLE_JOB_FIELDS {
        fields.remove(*immutable);
    }

    check_fields(&fields)?;

    if fields.is_empty() {
        return Err(AppError::validation("No updatable fields provided"));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn valid_body() -> Value {
        json!({
            "title": "Backend Engineer",
            "company": { "name": "Initech" },
            "industry": { "name": "Technology" },
            "posting_date": "2024-03-01"
        })
    }

    #[test]
    fn test_valid_job_passes() {
        let draft = validate_new_job(valid_body(), true).unwrap();
        assert_eq!(draft.job_id, None);
        let job = draft.into_job(12).unwrap();
        assert_eq!(job.job_id, 12);
        assert_eq!(job.company.name, "Initech");
    }

    #[test]
    fn test_client_job_id_kept() {
        let mut body = valid_body();
        body["job_id"] = json!(99);
        assert_eq!(validate_new_job(body, true).unwrap().job_id, Some(99));
    }

    #[test]
    fn test_non_integer_job_id_rejected() {
        let mut body = valid_body();
        body["job_id"] = json!("99");
        assert_eq!(message(validate_new_job(body, true).unwrap_err()), "job_id must be an integer");
    }

    #[test]
    fn test_missing_title() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("title");
        assert_eq!(message(validate_new_job(body, true).unwrap_err()), "Title is required");
    }

    #[test]
    fn test_blank_title() {
        let mut body = valid_body();
        body["title"] = json!("   ");
        assert_eq!(
            message(validate_new_job(body, true).unwrap_err()),
            "Title must be a non-empty string"
        );
    }

    #[test]
    fn test_company_checks() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("company");
        assert_eq!(
            message(validate_new_job(body.clone(), true).unwrap_err()),
            "Company information is required"
        );

        body["company"] = json!("Initech");
        assert_eq!(
            message(validate_new_job(body.clone(), true).unwrap_err()),
            "Company must be an object"
        );

        body["company"] = json!({ "size": "Large" });
        assert_eq!(
            message(validate_new_job(body, true).unwrap_err()),
            "Company name is required"
        );
    }

    #[test]
    fn test_industry_required_when_configured() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("industry");
        assert_eq!(
            message(validate_new_job(body.clone(), true).unwrap_err()),
            "Industry information is required"
        );
        assert!(validate_new_job(body, false).is_ok());
    }

    #[test]
    fn test_present_industry_always_checked() {
        let mut body = valid_body();
        body["industry"] = json!({ "name": "" });
        assert_eq!(
            message(validate_new_job(body.clone(), false).unwrap_err()),
            "Industry name is required"
        );
        body["industry"] = json!(["Technology"]);
        assert_eq!(
            message(validate_new_job(body, false).unwrap_err()),
            "Industry must be an object"
        );
    }

    #[test]
    fn test_missing_posting_date() {
        let mut body = valid_body();
        body["posting_date"] = json!("");
        assert_eq!(
            message(validate_new_job(body, true).unwrap_err()),
            "Posting date is required"
        );
    }

    #[test]
    fn test_unknown_field_on_create() {
        let mut body = valid_body();
        body["salary_band"] = json!("C");
        assert_eq!(
            message(validate_new_job(body, true).unwrap_err()),
            "Field 'salary_band' is not allowed"
        );
    }

    #[test]
    fn test_degree_level_must_be_known() {
        let mut body = valid_body();
        body["education_required"] = json!({ "level": "Doctorate", "field": "CS" });
        assert!(validate_new_job(body.clone(), true).is_err());
        body["education_required"] = json!({ "level": "PhD", "field": "CS" });
        assert!(validate_new_job(body, true).is_ok());
    }

    #[test]
    fn test_unknown_embedded_keys_rejected() {
        let mut body = valid_body();
        body["company"] = json!({ "name": "Initech", "founded": "1999" });
        let msg = message(validate_new_job(body, true).unwrap_err());
        assert!(msg.starts_with("Field 'company' must be"), "{msg}");
        assert!(msg.contains("founded"), "{msg}");

        let mut body = valid_body();
        body["industry"] = json!({ "name": "Technology", "growth": "high" });
        assert!(validate_new_job(body, true).is_err());

        assert!(validate_update(json!({
            "education_required": { "level": "PhD", "field": "CS", "minor": "Math" }
        }))
        .is_err());
    }

    #[test]
    fn test_non_object_body() {
        assert_eq!(
            message(validate_new_job(json!([1, 2]), true).unwrap_err()),
            "Request body must be a JSON object"
        );
    }

    #[test]
    fn test_update_strips_identity_fields() {
        let fields = validate_update(json!({
            "job_id": 5,
            "_id": "abc",
            "remote": true
        }))
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["remote"], json!(true));
    }

    #[test]
    fn test_update_only_identity_fields() {
        assert_eq!(
            message(validate_update(json!({ "job_id": 5 })).unwrap_err()),
            "No updatable fields provided"
        );
    }

    #[test]
    fn test_update_empty_body() {
        assert!(validate_update(json!({})).is_err());
    }

    #[test]
    fn test_update_unknown_field() {
        assert_eq!(
            message(validate_update(json!({ "title": "X", "bonus": 5 })).unwrap_err()),
            "Field 'bonus' is not allowed"
        );
    }

    #[test]
    fn test_update_type_mismatch() {
        assert_eq!(
            message(validate_update(json!({ "average_salary": "90000" })).unwrap_err()),
            "Field 'average_salary' must be an integer"
        );
        assert_eq!(
            message(validate_update(json!({ "average_salary": 90000.5 })).unwrap_err()),
            "Field 'average_salary' must be an integer"
        );
        assert_eq!(
            message(validate_update(json!({ "skills_required": ["Rust", 3] })).unwrap_err()),
            "Field 'skills_required' must be an array of strings"
        );
        assert_eq!(
            message(validate_update(json!({ "remote": "yes" })).unwrap_err()),
            "Field 'remote' must be a boolean"
        );
    }

    #[test]
    fn test_every_rule_is_unique() {
        for (i, r) in JOB_FIELDS.iter().enumerate() {
            assert!(JOB_FIELDS[i + 1..].iter().all(|o| o.name != r.name));
            assert!(!IMMUTABLE_JOB_FIELDS.contains(&r.name));
        }
    }
}
