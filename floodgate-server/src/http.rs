//! HTTP surface: router, per-request throttling, and the health endpoint.
//!
//! # API Endpoints
//!
//! - `GET /v1/healthcheck` -- liveness plus environment and version info
//! - `POST /v1/movies` -- create a movie, 201 with a Location header
//! - `GET /v1/movies/{id}` -- fetch a movie or a 404 JSON error
//!
//! Every route passes through the throttle middleware first; a denied
//! request is answered with 429 before its handler ever runs.

use crate::movies::{self, MovieStore};
use crate::notify::Notifier;
use crate::supervisor::TaskSupervisor;
use crate::throttle::ThrottleHandle;
use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::json;
use std::net::SocketAddr;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub throttle: ThrottleHandle,
    pub supervisor: TaskSupervisor,
    pub movies: MovieStore,
    pub notifier: Notifier,
    pub env: String,
}

/// Build the application router with the throttle middleware applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .route("/v1/movies", post(movies::create_movie))
        .route("/v1/movies/{id}", get(movies::show_movie))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_middleware,
        ))
        .with_state(state)
}

/// Request pipeline glue: consult the throttle before the handler runs.
///
/// The client identity is the peer address with the port stripped, so every
/// connection from one host shares one bucket.
async fn throttle_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let identity = addr.ip().to_string();
    if !state.throttle.allow(&identity).await {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
    }

    next.run(request).await
}

/// JSON error body shared by every rejection in the API
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn healthcheck(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.env,
            "version": VERSION,
        }
    }))
}
