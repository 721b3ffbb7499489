use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::user::{User, UserNew};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Self-service signup body. Deliberately has no admin flag; admin accounts
/// only come from POST /users.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// POST /auth/token - exchange credentials for a bearer token.
pub async fn token(
    State(state): State<AppState>,
    Json(data): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = User::authenticate(&state.pool, &data.username, &data.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username/password"))?;

    let token = state.gate.issue(&user.username, user.is_admin)?;
    Ok(Json(json!({ "token": token })))
}

/// POST /auth/register - create an account and return its first token.
pub async fn register(
    State(state): State<AppState>,
    Json(data): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = User::register(
        &state.pool,
        UserNew {
            username: data.username,
            password: data.password,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            is_admin: false,
        },
    )
    .await?;

    let token = state.gate.issue(&user.username, user.is_admin)?;
    Ok((StatusCode::CREATED, Json(json!({ "token": token }))))
}
