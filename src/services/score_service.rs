//! Live team score and party capacity updates.

use tracing::info;

use crate::{
    dao::models::LEGACY_SESSION_ID,
    dto::admin::{SetScoreRequest, SetTotalPlayersRequest},
    error::ServiceError,
    state::SharedState,
};

/// Set the live team score for the current session.
pub async fn set_score(state: &SharedState, request: SetScoreRequest) -> Result<(), ServiceError> {
    if request.value < 0 {
        return Err(ServiceError::InvalidInput(
            "team score must be non-negative".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let session_id = match store.current_session().await? {
        Some(session) => session.id,
        None => LEGACY_SESSION_ID,
    };

    store.set_score(session_id, request.value).await?;
    info!(session_id = %session_id, value = request.value, "team score updated");
    Ok(())
}

/// Persist the advertised party capacity.
pub async fn set_total_players(
    state: &SharedState,
    request: SetTotalPlayersRequest,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    store.set_total_players(request.value).await?;
    info!(value = request.value, "total players updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::memory::MemoryGameStore, models::SessionEntity},
        state::AppState,
    };

    #[tokio::test]
    async fn set_score_rejects_negative_values() {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;

        let result = set_score(&state, SetScoreRequest { value: -3 }).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn set_score_targets_current_session() {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        let store = state.game_store().await.unwrap();
        let session = SessionEntity::new("Final".into(), datetime!(2026-06-01 18:00 UTC));
        let session_id = session.id;
        store.create_current_session(session).await.unwrap();

        set_score(&state, SetScoreRequest { value: 14 }).await.unwrap();
        assert_eq!(store.score(session_id).await.unwrap(), Some(14));
    }
}
