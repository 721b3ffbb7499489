use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::database::models::user::{User, UserNew, UserUpdate};
use crate::error::ApiError;
use crate::AppState;

/// POST /users - admin-created account, may set the admin flag. Returns the
/// user along with a token so admins can hand out working credentials.
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<UserNew>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = User::register(&state.pool, data).await?;
    let token = state.gate.issue(&user.username, user.is_admin)?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// GET /users - list users. Admin only.
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let users = User::find_all(&state.pool).await?;
    Ok(Json(json!({ "users": users })))
}

/// GET /users/:username - single user. Self or admin.
pub async fn get(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = User::get(&state.pool, &username).await?;
    Ok(Json(json!({ "user": user })))
}

/// PATCH /users/:username - sparse update. Self or admin.
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(data): Json<UserUpdate>,
) -> Result<Json<Value>, ApiError> {
    let user = User::update(&state.pool, &username, data).await?;
    Ok(Json(json!({ "user": user })))
}

/// DELETE /users/:username - Self or admin.
pub async fn remove(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    User::remove(&state.pool, &username).await?;
    Ok(Json(json!({ "deleted": username })))
}
