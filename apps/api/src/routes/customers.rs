//! Handlers for the schemaless customer resource.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::parse_bool;
use crate::errors::AppError;
use crate::models::customer::{
    document_to_json, filter_from_query, into_update, json_to_document, parse_day,
};
use crate::routes::{parse_json_body, query_params};
use crate::state::AppState;

const INVALID_DATE: &str = "Invalid date format. Use YYYY-MM-DD.";

#[derive(Debug, Deserialize)]
pub struct BirthdateQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub active: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedCustomerResponse {
    pub message: String,
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedCustomerResponse {
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct InsertedCustomerResponse {
    pub message: String,
    pub inserted_id: String,
}

fn to_document(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(map) => json_to_document(map)
            .map_err(|e| AppError::validation(format!("Document cannot be stored: {e}"))),
        _ => Err(AppError::validation("Each document must be a JSON object")),
    }
}

fn to_json(docs: Vec<Document>) -> Vec<Value> {
    docs.into_iter().map(document_to_json).collect()
}

/// GET /api/v1/customers
///
/// Every query-string pair becomes an exact-match condition.
pub async fn handle_list(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Value>>, AppError> {
    let params = query_params(query)?;
    let filter = filter_from_query(&params);
    let docs = state.customers.find_matching(&filter).await?;
    if docs.is_empty() {
        return Err(AppError::not_found("No records are found"));
    }
    Ok(Json(to_json(docs)))
}

/// GET /api/v1/get_customer_by_id/:id
pub async fn handle_get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let oid = ObjectId::parse_str(&id)
        .map_err(|_| AppError::validation(format!("'{id}' is not a valid document id")))?;
    let doc = state
        .customers
        .find_by_id(oid)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;
    Ok(Json(document_to_json(doc)))
}

/// POST /api/v1/customers
///
/// Body is a JSON array of documents; responds with their new ids.
pub async fn handle_bulk_create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Vec<String>>), AppError> {
    let Value::Array(items) = parse_json_body(&body)? else {
        return Err(AppError::validation("Request body must be a JSON array"));
    };
    if items.is_empty() {
        return Err(AppError::validation(
            "Request body must contain at least one document",
        ));
    }

    let docs = items
        .into_iter()
        .map(to_document)
        .collect::<Result<Vec<_>, _>>()?;
    let ids = state.customers.insert_many(docs).await?;
    info!("Inserted {} customer document(s)", ids.len());

    Ok((
        StatusCode::CREATED,
        Json(ids.into_iter().map(|id| id.to_hex()).collect()),
    ))
}

/// POST /api/v1/customers/:username
///
/// Body is an update document; a plain field map is applied with `$set`.
/// Responds 304 when the customer exists but nothing changed.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let update = to_document(parse_json_body(&body)?)?;
    if update.is_empty() {
        return Err(AppError::validation(
            "Request body must contain at least one field to update",
        ));
    }

    let outcome = state
        .customers
        .update_by_username(&username, into_update(update))
        .await?;
    if outcome.matched == 0 {
        return Err(AppError::not_found(format!(
            "Customer '{username}' not found"
        )));
    }
    if outcome.modified == 0 {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    info!("Updated customer {username}");
    Ok(Json(UpdatedCustomerResponse {
        message: "Customer updated".to_string(),
        matched_count: outcome.matched,
        modified_count: outcome.modified,
    })
    .into_response())
}

/// DELETE /api/v1/customers/:username
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<DeletedCustomerResponse>, AppError> {
    let deleted = state.customers.delete_by_username(&username).await?;
    if deleted == 0 {
        return Err(AppError::not_found(format!(
            "Customer '{username}' not found"
        )));
    }
    info!("Removed customer {username}");

    Ok(Json(DeletedCustomerResponse {
        message: "Customer removed".to_string(),
        deleted_count: deleted,
    }))
}

/// GET /customers_by_birthdate?start_date=&end_date=&active=
pub async fn handle_by_birthdate(
    State(state): State<AppState>,
    query: Result<Query<BirthdateQuery>, QueryRejection>,
) -> Result<Json<Vec<Value>>, AppError> {
    let params = query_params(query)?;
    let (Some(start), Some(end)) = (params.start_date.as_deref(), params.end_date.as_deref())
    else {
        return Err(AppError::validation(
            "Both start_date and end_date parameters are required",
        ));
    };

    let start = parse_day(start).ok_or_else(|| AppError::validation(INVALID_DATE))?;
    let end = parse_day(end).ok_or_else(|| AppError::validation(INVALID_DATE))?;
    let active = params
        .active
        .as_deref()
        .map(parse_bool)
        .transpose()
        .map_err(|_| AppError::validation("active must be true or false"))?;

    let docs = state
        .customers
        .find_by_birthdate(start, end, active)
        .await?;
    Ok(Json(to_json(docs)))
}

/// POST /insert_customer
///
/// Stores one customer; `birthdate` must be `YYYY-MM-DD` and is saved as a
/// datetime.
pub async fn handle_insert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<InsertedCustomerResponse>), AppError> {
    let mut doc = to_document(parse_json_body(&body)?)?;

    let birthdate = match doc.get("birthdate") {
        Some(Bson::String(raw)) => {
            parse_day(raw).ok_or_else(|| AppError::validation(INVALID_DATE))?
        }
        Some(_) => return Err(AppError::validation(INVALID_DATE)),
        None => return Err(AppError::validation("birthdate field is required")),
    };
    doc.insert("birthdate", birthdate);

    let id = state.customers.insert_one(doc).await?;
    info!("Inserted customer {}", id.to_hex());

    Ok((
        StatusCode::CREATED,
        Json(InsertedCustomerResponse {
            message: "Insert successful".to_string(),
            inserted_id: id.to_hex(),
        }),
    ))
}
