use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::database::models::job::{Job, JobNew, JobSearch, JobUpdate};
use crate::error::ApiError;
use crate::AppState;

/// POST /jobs - create a job posting. Admin only.
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<JobNew>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_equity(data.equity)?;

    let job = Job::create(&state.pool, data).await?;
    Ok((StatusCode::CREATED, Json(json!({ "job": job }))))
}

/// GET /jobs - list jobs, optionally filtered by title substring, minimum
/// salary and equity presence.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<JobSearch>,
) -> Result<Json<Value>, ApiError> {
    let jobs = if filters.is_empty() {
        Job::find_all(&state.pool).await?
    } else {
        Job::search(&state.pool, &filters).await?
    };

    Ok(Json(json!({ "jobs": jobs })))
}

/// GET /jobs/:id - single job.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let job = Job::get(&state.pool, id).await?;
    Ok(Json(json!({ "job": job })))
}

/// PATCH /jobs/:id - sparse update. Admin only.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<JobUpdate>,
) -> Result<Json<Value>, ApiError> {
    validate_equity(data.equity)?;

    let job = Job::update(&state.pool, id, data).await?;
    Ok(Json(json!({ "job": job })))
}

/// DELETE /jobs/:id - Admin only.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    Job::remove(&state.pool, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

/// Equity is a share of the company; it can't exceed 1.0 or be negative.
fn validate_equity(equity: Option<Decimal>) -> Result<(), ApiError> {
    if let Some(equity) = equity {
        if equity < Decimal::ZERO || equity > Decimal::ONE {
            return Err(ApiError::bad_request("equity must be between 0 and 1"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equity_bounds_are_inclusive() {
        assert!(validate_equity(None).is_ok());
        assert!(validate_equity(Some(Decimal::ZERO)).is_ok());
        assert!(validate_equity(Some(Decimal::ONE)).is_ok());
        assert!(validate_equity(Some(Decimal::new(5, 1))).is_ok());

        assert!(validate_equity(Some(Decimal::new(11, 1))).is_err());
        assert!(validate_equity(Some(Decimal::new(-1, 1))).is_err());
    }
}
