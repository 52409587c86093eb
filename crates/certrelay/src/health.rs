//! `GET /healthcheck`.
//!
//! Stateless apart from the shared [`Liveness`] clocks; runs beside the relay
//! loop and never touches it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use certrelay_core::Liveness;
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;

pub const HEALTHCHECK_PATH: &str = "/healthcheck";

/// Overall bound on a health request.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for the health router.
#[derive(Clone)]
pub struct HealthState {
    pub liveness: Arc<Liveness>,
    pub max_staleness: Duration,
}

impl HealthState {
    pub const fn new(liveness: Arc<Liveness>, max_staleness: Duration) -> Self {
        Self {
            liveness,
            max_staleness,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<&'static str, &'a str>,
}

/// Build the router serving the liveness endpoint.
pub fn build_router(state: HealthState) -> Router {
    Router::new()
        .route(HEALTHCHECK_PATH, get(healthcheck))
        .layer(timeout_layer())
        .with_state(state)
}

/// Answers 408 once a request has run for [`HEALTH_TIMEOUT`].
fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, HEALTH_TIMEOUT)
}

/// 200 when both clocks are fresh, 503 with one message per failing check
/// otherwise.
async fn healthcheck(State(state): State<HealthState>) -> Response {
    let report = state.liveness.check(SystemTime::now(), state.max_staleness);
    let errors: BTreeMap<_, _> = report.failures().collect();

    if errors.is_empty() {
        let body = HealthBody {
            status: "OK",
            errors,
        };
        (StatusCode::OK, Json(body)).into_response()
    } else {
        let body = HealthBody {
            status: "Service Unavailable",
            errors,
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
