use axum::extract::FromRef;
use sqlx::PgPool;

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;

use crate::auth::AuthGate;

/// Shared application state handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gate: AuthGate,
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> AuthGate {
        state.gate.clone()
    }
}
