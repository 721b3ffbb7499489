use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::database::models::company::{Company, CompanyNew, CompanySearch, CompanyUpdate};
use crate::database::models::job::Job;
use crate::error::ApiError;
use crate::AppState;

/// POST /companies - create a company. Admin only.
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<CompanyNew>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let company = Company::create(&state.pool, data).await?;
    Ok((StatusCode::CREATED, Json(json!({ "company": company }))))
}

/// GET /companies - list companies, optionally filtered by name substring
/// and employee-count range.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<CompanySearch>,
) -> Result<Json<Value>, ApiError> {
    if let (Some(min), Some(max)) = (filters.min_employees, filters.max_employees) {
        if min > max {
            return Err(ApiError::bad_request("minEmployees cannot exceed maxEmployees"));
        }
    }

    let companies = if filters.is_empty() {
        Company::find_all(&state.pool).await?
    } else {
        Company::search(&state.pool, &filters).await?
    };

    Ok(Json(json!({ "companies": companies })))
}

/// GET /companies/:handle - company detail with its jobs.
pub async fn get(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let company = Company::get(&state.pool, &handle).await?;
    let jobs = Job::find_by_company(&state.pool, &handle).await?;

    Ok(Json(json!({ "company": company, "jobs": jobs })))
}

/// PATCH /companies/:handle - sparse update. Admin only.
pub async fn update(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Json(data): Json<CompanyUpdate>,
) -> Result<Json<Value>, ApiError> {
    let company = Company::update(&state.pool, &handle, data).await?;
    Ok(Json(json!({ "company": company })))
}

/// DELETE /companies/:handle - Admin only.
pub async fn remove(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Company::remove(&state.pool, &handle).await?;
    Ok(Json(json!({ "deleted": handle })))
}
