//! Guess submission, deletion and the admin winner toggle.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GuessInsert,
        models::{GuessEntity, LEGACY_SESSION_ID},
    },
    dto::game::{GuessResponse, MAX_GUESS_VALUE, MIN_GUESS_VALUE, SubmitGuessRequest},
    error::ServiceError,
    state::SharedState,
};

/// Who is asking for a guess to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester<'a> {
    /// A participant identified by the name they submitted under.
    Participant(&'a str),
    /// The administrator; may remove any guess.
    Admin,
}

/// Register a participant's guess.
///
/// Uniqueness (one value per session, one guess per participant) is enforced
/// by a single atomic insert at the storage layer, never by a separate
/// check-then-act read.
pub async fn submit_guess(
    state: &SharedState,
    request: SubmitGuessRequest,
) -> Result<GuessResponse, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "participant name must not be blank".into(),
        ));
    }
    if !(MIN_GUESS_VALUE..=MAX_GUESS_VALUE).contains(&request.value) {
        return Err(ServiceError::InvalidInput(format!(
            "guess value must be between {MIN_GUESS_VALUE} and {MAX_GUESS_VALUE}"
        )));
    }

    let store = state.require_game_store().await?;

    let session_id = match request.session_id {
        Some(id) => id,
        None => match store.current_session().await? {
            Some(session) => session.id,
            None => LEGACY_SESSION_ID,
        },
    };

    if session_id != LEGACY_SESSION_ID {
        let session = store
            .find_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))?;
        if session.ended {
            return Err(ServiceError::AlreadyEnded);
        }
    }

    let guess = GuessEntity::new(session_id, name.to_owned(), request.value);
    let response = GuessResponse {
        id: guess.id,
        session_id,
        name: guess.participant.clone(),
        value: guess.value,
    };

    match store.insert_guess(guess).await? {
        GuessInsert::Inserted => {}
        GuessInsert::DuplicateValue => return Err(ServiceError::DuplicateValue(request.value)),
        GuessInsert::DuplicateParticipant => {
            return Err(ServiceError::DuplicateParticipant(name.to_owned()));
        }
    }

    // Stats are best effort; losing one tick never fails the submission.
    if let Err(err) = store.increment_games_played(name).await {
        warn!(participant = name, error = %err, "failed to bump games-played counter");
    }

    info!(guess_id = %response.id, session_id = %session_id, value = response.value, "guess registered");
    Ok(response)
}

/// Remove a guess on behalf of its owner or the admin.
pub async fn delete_guess(
    state: &SharedState,
    id: Uuid,
    requester: Requester<'_>,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;

    let guess = store
        .find_guess(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("guess `{id}` not found")))?;

    if let Requester::Participant(name) = requester {
        if guess.participant != name.trim() {
            return Err(ServiceError::Forbidden(
                "only the owner or the admin may remove a guess".into(),
            ));
        }
    }

    if !store.delete_guess(id).await? {
        return Err(ServiceError::NotFound(format!("guess `{id}` not found")));
    }

    info!(guess_id = %id, "guess removed");
    Ok(())
}

/// Toggle the winner flag on a guess.
///
/// Crowning a winner also bumps career stats, best effort: a stats failure
/// never rolls the toggle back.
pub async fn set_winner(
    state: &SharedState,
    id: Uuid,
    is_winner: bool,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;

    let guess = store
        .find_guess(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("guess `{id}` not found")))?;

    if !store.set_winner(id, is_winner).await? {
        return Err(ServiceError::NotFound(format!("guess `{id}` not found")));
    }

    if is_winner {
        if let Err(err) = store.increment_wins(&guess.participant).await {
            warn!(participant = %guess.participant, error = %err, "failed to bump wins counter");
        }
        if let Err(err) = store.record_best_score(&guess.participant, guess.value).await {
            warn!(participant = %guess.participant, error = %err, "failed to record best score");
        }
    }

    info!(guess_id = %id, is_winner, "winner flag updated");
    Ok(())
}

/// Admin wipe of every guess attached to the current and legacy sessions.
pub async fn clear_guesses(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.require_game_store().await?;

    let mut removed = store.clear_guesses(LEGACY_SESSION_ID).await?;
    if let Some(session) = store.current_session().await? {
        removed += store.clear_guesses(session.id).await?;
    }

    info!(removed, "cleared guesses");
    Ok(removed)
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

    async fn state_with_session() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        let store = state.game_store().await.unwrap();
        let session = SessionEntity::new("Final".into(), datetime!(2026-06-01 18:00 UTC));
        let id = session.id;
        store.create_current_session(session).await.unwrap();
        (state, id)
    }

    fn request(name: &str, value: i64) -> SubmitGuessRequest {
        SubmitGuessRequest {
            name: name.into(),
            value,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn submit_guess_attaches_to_current_session() {
        let (state, session_id) = state_with_session().await;
        let response = submit_guess(&state, request("Alice", 27)).await.unwrap();
        assert_eq!(response.session_id, session_id);
    }

    #[tokio::test]
    async fn submit_guess_rejects_out_of_range_values() {
        let (state, _) = state_with_session().await;
        assert!(matches!(
            submit_guess(&state, request("Alice", -1)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_guess(&state, request("Alice", 401)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(submit_guess(&state, request("Alice", 400)).await.is_ok());
    }

    #[tokio::test]
    async fn submit_guess_surfaces_specific_conflicts() {
        let (state, _) = state_with_session().await;
        submit_guess(&state, request("Alice", 27)).await.unwrap();

        assert!(matches!(
            submit_guess(&state, request("Bob", 27)).await,
            Err(ServiceError::DuplicateValue(27))
        ));
        assert!(matches!(
            submit_guess(&state, request("Alice", 31)).await,
            Err(ServiceError::DuplicateParticipant(_))
        ));
    }

    #[tokio::test]
    async fn submit_guess_without_session_uses_legacy_scope() {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;

        let response = submit_guess(&state, request("Alice", 27)).await.unwrap();
        assert_eq!(response.session_id, LEGACY_SESSION_ID);
    }

    #[tokio::test]
    async fn submit_guess_rejected_after_game_end() {
        let (state, session_id) = state_with_session().await;
        let store = state.game_store().await.unwrap();
        store.mark_ended(session_id, 24).await.unwrap();

        assert!(matches!(
            submit_guess(&state, request("Alice", 27)).await,
            Err(ServiceError::AlreadyEnded)
        ));
    }

    #[tokio::test]
    async fn delete_guess_enforces_ownership() {
        let (state, _) = state_with_session().await;
        let guess = submit_guess(&state, request("Alice", 27)).await.unwrap();

        assert!(matches!(
            delete_guess(&state, guess.id, Requester::Participant("Bob")).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(
            delete_guess(&state, guess.id, Requester::Participant("Alice"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn admin_can_delete_any_guess() {
        let (state, _) = state_with_session().await;
        let guess = submit_guess(&state, request("Alice", 27)).await.unwrap();
        assert!(delete_guess(&state, guess.id, Requester::Admin).await.is_ok());
    }

    #[tokio::test]
    async fn set_winner_records_stats_best_effort() {
        let (state, _) = state_with_session().await;
        let guess = submit_guess(&state, request("Alice", 27)).await.unwrap();

        set_winner(&state, guess.id, true).await.unwrap();

        let store = state.game_store().await.unwrap();
        let stats = store.stats("Alice").await.unwrap().unwrap();
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.best_score, Some(27));
    }

    #[tokio::test]
    async fn clear_guesses_wipes_current_and_legacy_scopes() {
        let (state, _) = state_with_session().await;
        submit_guess(&state, request("Alice", 27)).await.unwrap();
        submit_guess(
            &state,
            SubmitGuessRequest {
                name: "Bob".into(),
                value: 31,
                session_id: Some(LEGACY_SESSION_ID),
            },
        )
        .await
        .unwrap();

        let removed = clear_guesses(&state).await.unwrap();
        assert_eq!(removed, 2);
    }
}
