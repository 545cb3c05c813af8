use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the degraded flag, pinging the backend so connectivity issues end
/// up in the logs even while the flag has not flipped yet.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Some(store) = state.game_store().await {
        if let Err(err) = store.health_check().await {
            warn!(error = %err, "storage health check failed");
        }
    } else {
        warn!("storage unavailable (degraded mode)");
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
