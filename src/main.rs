use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use jobly_api::auth::AuthGate;
use jobly_api::config::{self, Environment};
use jobly_api::database;
use jobly_api::handlers::{auth, companies, jobs, users};
use jobly_api::middleware::{authenticate, require_admin, require_self_or_admin};
use jobly_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Jobly API in {:?} mode", config.environment);

    if matches!(config.environment, Environment::Production) && config.security.jwt_secret.is_empty()
    {
        anyhow::bail!("SECRET_KEY must be set in production");
    }

    let pool = database::connect(&config.database).await?;
    let gate = AuthGate::new(&config.security.jwt_secret, config.security.jwt_expiry_hours);
    let state = AppState { pool, gate };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Jobly API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Public token acquisition
        .route("/auth/token", post(auth::token))
        .route("/auth/register", post(auth::register))
        // Resources
        .nest("/companies", company_routes())
        .nest("/jobs", job_routes())
        .nest("/users", user_routes())
        // Attach claims before any policy check runs
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn company_routes() -> Router<AppState> {
    use axum::routing::patch;

    let open = Router::new()
        .route("/", get(companies::list))
        .route("/:handle", get(companies::get));

    let admin = Router::new()
        .route("/", post(companies::create))
        .route("/:handle", patch(companies::update).delete(companies::remove))
        .route_layer(middleware::from_fn(require_admin));

    open.merge(admin)
}

fn job_routes() -> Router<AppState> {
    use axum::routing::patch;

    let open = Router::new().route("/", get(jobs::list));

    // Single-job reads keep the ownership-style check they shipped with
    let view = Router::new()
        .route("/:id", get(jobs::get))
        .route_layer(middleware::from_fn(require_self_or_admin));

    let admin = Router::new()
        .route("/", post(jobs::create))
        .route("/:id", patch(jobs::update).delete(jobs::remove))
        .route_layer(middleware::from_fn(require_admin));

    open.merge(view).merge(admin)
}

fn user_routes() -> Router<AppState> {
    use axum::routing::patch;

    let admin = Router::new()
        .route("/", get(users::list).post(users::create))
        .route_layer(middleware::from_fn(require_admin));

    let self_or_admin = Router::new()
        .route(
            "/:username",
            get(users::get).patch(users::update).delete(users::remove),
        )
        .route_layer(middleware::from_fn(require_self_or_admin));

    admin.merge(self_or_admin)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match database::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
