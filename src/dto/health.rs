use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when storage answers, "degraded" while it does not.
    pub status: &'static str,
}

impl HealthResponse {
    /// Storage is reachable and the service is fully operational.
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    /// Storage is gone; reads and writes will fail until it returns.
    pub fn degraded() -> Self {
        Self { status: "degraded" }
    }
}
