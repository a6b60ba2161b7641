pub mod customers;
pub mod health;
pub mod jobs;


use axum::{
    extract::{rejection::QueryRejection, Query},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::Value;

use crate::errors::AppError;
use crate::state::AppState;

/// Fallback for any path or method without a handler.
async fn route_not_supported() -> AppError {
    AppError::not_found("This route is currently not supported.")
}

/// Parses a raw request body as JSON, rejecting empty bodies.
pub(crate) fn parse_json_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::validation("Request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Request body is not valid JSON: {e}")))
}

/// Unwraps query-string extraction, rendering failures (such as a repeated
/// parameter) as validation errors instead of axum's plain-text rejection.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| AppError::validation(format!("Invalid query string: {}", e.body_text())))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        // Generic customer resource
        .route(
            "/api/v1/customers",
            get(customers::handle_list).post(customers::handle_bulk_create),
        )
        .route(
            "/api/v1/customers/:username",
            post(customers::handle_update).delete(customers::handle_delete),
        )
        .route(
            "/api/v1/get_customer_by_id/:id",
            get(customers::handle_get_by_id),
        )
        .route(
            "/customers_by_birthdate",
            get(customers::handle_by_birthdate),
        )
        .route("/insert_customer", post(customers::handle_insert))
        // Jobs
        .route("/api/v1/jobs", post(jobs::handle_create))
        .route(
            "/api/v1/job/:job_id",
            get(jobs::handle_get)
                .patch(jobs::handle_update)
                .delete(jobs::handle_delete),
        )
        .route("/api/v1/jobs/industry/:name", get(jobs::handle_by_industry))
        .route("/api/v1/jobs/company/:name", get(jobs::handle_by_company))
        .route("/api/v1/jobs/degree/:level", get(jobs::handle_by_degree))
        .route("/api/v1/jobs/skill/:skill", get(jobs::handle_by_skill))
        .route(
            "/api/v1/jobs/experience/:level",
            get(jobs::handle_by_experience),
        )
        .route(
            "/api/v1/jobs/location/:location",
            get(jobs::handle_by_location),
        )
        .route("/api/v1/jobs/skills/:skills", get(jobs::handle_by_skills))
        .route("/api/v1/jobs/salary", get(jobs::handle_by_salary))
        .route(
            "/api/v1/jobs/stats/industries",
            get(jobs::handle_industry_counts),
        )
        .route("/api/v1/jobs/top-salaries", get(jobs::handle_top_salaries))
        .route("/api/v1/jobs/companies", get(jobs::handle_companies))
        // Known path, unhandled method
        .method_not_allowed_fallback(route_not_supported)
        .fallback(route_not_supported)
        .with_state(state)
}
