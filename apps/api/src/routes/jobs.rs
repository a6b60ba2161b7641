//! Axum route handlers for the Jobs API.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::job::{IndustryCount, Job, JobField, JobView};
use crate::routes::{parse_json_body, query_params};
use crate::state::AppState;
use crate::validation::{validate_new_job, validate_update};

/// Size of the top-salaries listing.
pub const TOP_PAID_LIMIT: i64 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreatedJobResponse {
    pub message: String,
    pub id: String,
    pub job_id: i64,
}

#[derive(Debug, Serialize)]
pub struct FieldQueryResponse {
    pub field: &'static str,
    pub query: String,
    pub count: usize,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize)]
pub struct SkillsQueryResponse {
    pub skills: Vec<String>,
    pub count: usize,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Deserialize)]
pub struct SalaryQuery {
    pub min_salary: Option<String>,
    pub max_salary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SalaryQueryResponse {
    pub min_salary: i64,
    pub max_salary: i64,
    pub count: usize,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize)]
pub struct IndustryCountsResponse {
    pub count: usize,
    pub industries: Vec<IndustryCount>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub count: usize,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize)]
pub struct CompaniesResponse {
    pub count: usize,
    pub companies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedJobResponse {
    pub message: String,
    pub job_id: i64,
    pub updated_fields: Vec<String>,
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedJobResponse {
    pub message: String,
    pub job_id: i64,
    pub deleted_count: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn parse_job_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation(format!("job_id must be an integer, got '{raw}'")))
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<i64, AppError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        AppError::validation("Both min_salary and max_salary query parameters are required")
    })?;
    raw.parse()
        .map_err(|_| AppError::validation(format!("{name} must be an integer")))
}

/// Splits an `&`-delimited skill list, dropping blank entries.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split('&')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn views(jobs: Vec<Job>) -> Vec<JobView> {
    jobs.into_iter().map(JobView::from).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs
///
/// Validates and stores a new posting. A missing `job_id` is assigned as one
/// past the current maximum; a taken one is rejected with 400.
pub async fn handle_create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedJobResponse>), AppError> {
    let payload = parse_json_body(&body)?;
    let draft = validate_new_job(payload, state.config.require_industry)?;

    let requested = draft.job_id;
    // Placeholder id; the store assigns the real one atomically with the insert
    let job = draft.into_job(requested.unwrap_or_default())?;
    let (id, job_id) = state.jobs.insert_new(job, requested).await?;
    info!("Created job {job_id} ({})", id.to_hex());

    Ok((
        StatusCode::CREATED,
        Json(CreatedJobResponse {
            message: "Job posting created successfully".to_string(),
            id: id.to_hex(),
            job_id,
        }),
    ))
}

/// GET /api/v1/job/:job_id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<JobView>, AppError> {
    let job_id = parse_job_id(&raw_id)?;
    let job = state
        .jobs
        .find_by_job_id(job_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job with job_id {job_id} not found")))?;
    Ok(Json(JobView::from(job)))
}

async fn query_by_field(
    state: &AppState,
    field: JobField,
    term: &str,
) -> Result<Json<FieldQueryResponse>, AppError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(AppError::validation(format!(
            "A value for {} is required",
            field.path()
        )));
    }

    let jobs = state.jobs.find_by_field(field, term).await?;
    if jobs.is_empty() {
        return Err(AppError::not_found(format!(
            "No jobs found with {} '{term}'",
            field.path()
        )));
    }

    Ok(Json(FieldQueryResponse {
        field: field.path(),
        query: term.to_string(),
        count: jobs.len(),
        jobs: views(jobs),
    }))
}

/// GET /api/v1/jobs/industry/:name
pub async fn handle_by_industry(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Industry, &name).await
}

/// GET /api/v1/jobs/company/:name
pub async fn handle_by_company(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Company, &name).await
}

/// GET /api/v1/jobs/degree/:level
pub async fn handle_by_degree(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Degree, &level).await
}

/// GET /api/v1/jobs/skill/:skill
pub async fn handle_by_skill(
    State(state): State<AppState>,
    Path(skill): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Skill, &skill).await
}

/// GET /api/v1/jobs/experience/:level
pub async fn handle_by_experience(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Experience, &level).await
}

/// GET /api/v1/jobs/location/:location
pub async fn handle_by_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<FieldQueryResponse>, AppError> {
    query_by_field(&state, JobField::Location, &location).await
}

/// GET /api/v1/jobs/skills/:skills
///
/// `skills` is `&`-delimited; a job must list every one of them.
pub async fn handle_by_skills(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<SkillsQueryResponse>, AppError> {
    let skills = split_skills(&raw);
    if skills.is_empty() {
        return Err(AppError::validation(
            "At least one skill is required, separated by '&'",
        ));
    }

    let jobs = state.jobs.find_with_all_skills(&skills).await?;
    if jobs.is_empty() {
        return Err(AppError::not_found(format!(
            "No jobs found requiring all of: {}",
            skills.join(", ")
        )));
    }

    Ok(Json(SkillsQueryResponse {
        skills,
        count: jobs.len(),
        jobs: views(jobs),
    }))
}

/// GET /api/v1/jobs/salary?min_salary=&max_salary=
pub async fn handle_by_salary(
    State(state): State<AppState>,
    query: Result<Query<SalaryQuery>, QueryRejection>,
) -> Result<Json<SalaryQueryResponse>, AppError> {
    let params = query_params(query)?;
    let min = parse_bound("min_salary", params.min_salary.as_deref())?;
    let max = parse_bound("max_salary", params.max_salary.as_deref())?;
    if min > max {
        return Err(AppError::validation(
            "min_salary cannot be greater than max_salary",
        ));
    }

    let jobs = state.jobs.find_by_salary_range(min, max).await?;
    if jobs.is_empty() {
        return Err(AppError::not_found(format!(
            "No jobs found with average salary between {min} and {max}"
        )));
    }

    Ok(Json(SalaryQueryResponse {
        min_salary: min,
        max_salary: max,
        count: jobs.len(),
        jobs: views(jobs),
    }))
}

/// GET /api/v1/jobs/stats/industries
pub async fn handle_industry_counts(
    State(state): State<AppState>,
) -> Result<Json<IndustryCountsResponse>, AppError> {
    let industries = state.jobs.count_by_industry().await?;
    if industries.is_empty() {
        return Err(AppError::not_found("No jobs found"));
    }
    Ok(Json(IndustryCountsResponse {
        count: industries.len(),
        industries,
    }))
}

/// GET /api/v1/jobs/top-salaries
pub async fn handle_top_salaries(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    let jobs = state.jobs.top_paid(TOP_PAID_LIMIT).await?;
    if jobs.is_empty() {
        return Err(AppError::not_found("No jobs found"));
    }
    Ok(Json(JobListResponse {
        count: jobs.len(),
        jobs: views(jobs),
    }))
}

/// GET /api/v1/jobs/companies
pub async fn handle_companies(
    State(state): State<AppState>,
) -> Result<Json<CompaniesResponse>, AppError> {
    let companies = state.jobs.distinct_companies().await?;
    if companies.is_empty() {
        return Err(AppError::not_found("No companies found"));
    }
    Ok(Json(CompaniesResponse {
        count: companies.len(),
        companies,
    }))
}

/// PATCH /api/v1/job/:job_id
///
/// Applies whitelisted fields with `$set` semantics. `job_id` and `_id` in the
/// body are dropped without error.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<UpdatedJobResponse>, AppError> {
    let job_id = parse_job_id(&raw_id)?;
    let payload = parse_json_body(&body)?;
    let fields = validate_update(payload)?;

    let outcome = state.jobs.update_fields(job_id, &fields).await?;
    if outcome.matched == 0 {
        return Err(AppError::not_found(format!(
            "Job with job_id {job_id} not found"
        )));
    }
    info!(
        "Updated job {job_id}: {} field(s), {} modified",
        fields.len(),
        outcome.modified
    );

    let mut updated_fields: Vec<String> = fields.keys().cloned().collect();
    updated_fields.sort();

    Ok(Json(UpdatedJobResponse {
        message: "Job posting updated successfully".to_string(),
        job_id,
        updated_fields,
        modified_count: outcome.modified,
    }))
}

/// DELETE /api/v1/job/:job_id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeletedJobResponse>, AppError> {
    let job_id = parse_job_id(&raw_id)?;
    let deleted = state.jobs.delete_by_job_id(job_id).await?;
    if deleted == 0 {
        return Err(AppError::not_found(format!(
            "Job with job_id {job_id} not found"
        )));
    }
    info!("Deleted job {job_id}");

    Ok(Json(DeletedJobResponse {
        message: "Job posting deleted successfully".to_string(),
        job_id,
        deleted_count: deleted,
    }))
}
