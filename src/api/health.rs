//! Liveness and readiness probes.
//!
//! Liveness reports whether the process is up at all; readiness flips on
//! once the database connection and indexes are in place, so orchestrators
//! hold traffic back during startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

/// Shared readiness flag, flipped by the composition root.
#[derive(Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    /// Fresh, not-yet-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark startup as complete.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Probe response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    #[schema(example = "ok")]
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthReport))
)]
pub async fn live() -> HttpResponse {
    HttpResponse::Ok().json(HealthReport { status: "ok" })
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve traffic", body = HealthReport),
        (status = 503, description = "Still starting", body = HealthReport)
    )
)]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    if state.is_ready() {
        HttpResponse::Ok().json(HealthReport { status: "ok" })
    } else {
        HttpResponse::ServiceUnavailable().json(HealthReport { status: "starting" })
    }
}
