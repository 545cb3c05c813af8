//! Consolidated snapshot assembly for the polling clients.
//!
//! Everything a client renders comes out of one snapshot, so a poll never
//! observes a team score from one instant paired with guesses from another.

use time::OffsetDateTime;
use tracing::warn;

use crate::{
    dto::{
        format_timestamp,
        game::{GameTimerSnapshot, PlayerSnapshot, SnapshotResponse},
    },
    error::ServiceError,
    state::{
        SharedState,
        phase::{self, GuessStatus},
    },
};

/// Assemble the full game view for the current session.
///
/// This is also where the countdown lazily disarms itself: the first reader
/// past kickoff triggers the `mark_started` write. The write is idempotent,
/// so concurrent or repeated triggers are harmless, and a failed write only
/// degrades this one snapshot (the timer still reads as armed).
pub async fn get_snapshot(state: &SharedState) -> Result<SnapshotResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let mut session = store
        .current_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no current session".into()))?;

    let now = OffsetDateTime::now_utc();
    let resolution = phase::resolve_phase(now, &session);
    if resolution.deactivate {
        match store.mark_started(session.id).await {
            Ok(_) => {
                session.is_active = false;
                session.started = true;
            }
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "failed to disarm countdown at kickoff");
            }
        }
    }

    let team_score = store.score(session.id).await?.unwrap_or(0);
    let total_players = match store.total_players().await? {
        Some(value) => value,
        None => state.config().total_players(),
    };

    let players = store
        .list_guesses(session.id)
        .await?
        .into_iter()
        .map(|guess| {
            let status = phase::guess_status(team_score, guess.value, guess.is_winner);
            PlayerSnapshot {
                id: guess.id,
                name: guess.participant,
                score: guess.value,
                winner: status == GuessStatus::Winner,
                eliminated: status == GuessStatus::Eliminated,
            }
        })
        .collect();

    Ok(SnapshotResponse {
        session_id: session.id,
        session_name: session.name.clone(),
        phase: resolution.phase,
        game_started: phase::game_started(now, session.target_start_time, session.is_active),
        game_ended: session.ended,
        final_score: session.final_score,
        team_score,
        total_players,
        game_timer: GameTimerSnapshot {
            target_date: format_timestamp(session.target_start_time),
            is_active: session.is_active,
        },
        players,
        poll_interval_secs: state.config().poll_interval().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::memory::MemoryGameStore, models::SessionEntity},
        state::{AppState, phase::GamePhase},
    };

    async fn state_with_session(target: OffsetDateTime, is_active: bool) -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        let store = state.game_store().await.unwrap();
        let mut session = SessionEntity::new("Final".into(), target);
        session.is_active = is_active;
        let id = session.id;
        store.create_current_session(session).await.unwrap();
        (state, id)
    }

    #[tokio::test]
    async fn countdown_running_snapshot() {
        let target = OffsetDateTime::now_utc() + Duration::hours(2);
        let (state, _) = state_with_session(target, true).await;

        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.phase, GamePhase::GuessingOpen);
        assert!(!snapshot.game_started);
        assert!(snapshot.game_timer.is_active);
        assert_eq!(snapshot.team_score, 0);
    }

    #[tokio::test]
    async fn disarmed_future_session_is_scheduled() {
        let target = OffsetDateTime::now_utc() + Duration::hours(2);
        let (state, _) = state_with_session(target, false).await;

        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.phase, GamePhase::Scheduled);
        assert!(!snapshot.game_started);
    }

    #[tokio::test]
    async fn kickoff_disarms_countdown_and_reports_started() {
        let target = OffsetDateTime::now_utc() - Duration::seconds(5);
        let (state, session_id) = state_with_session(target, true).await;

        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.phase, GamePhase::InProgress);
        assert!(snapshot.game_started);
        assert!(!snapshot.game_timer.is_active);

        // The lazy write persisted the flip.
        let store = state.game_store().await.unwrap();
        let session = store.find_session(session_id).await.unwrap().unwrap();
        assert!(!session.is_active);
        assert!(session.started);
    }

    #[tokio::test]
    async fn repeated_snapshots_past_kickoff_are_stable() {
        let target = OffsetDateTime::now_utc() - Duration::seconds(5);
        let (state, _) = state_with_session(target, true).await;

        let first = get_snapshot(&state).await.unwrap();
        let second = get_snapshot(&state).await.unwrap();
        assert_eq!(first.phase, second.phase);
        assert_eq!(second.phase, GamePhase::InProgress);
        assert!(second.game_started);
    }

    #[tokio::test]
    async fn eliminations_follow_the_live_score() {
        let target = OffsetDateTime::now_utc() - Duration::minutes(30);
        let (state, session_id) = state_with_session(target, true).await;
        let store = state.game_store().await.unwrap();

        for (name, value) in [("Alice", 10_i64), ("Bob", 15), ("Carol", 20)] {
            store
                .insert_guess(crate::dao::models::GuessEntity::new(
                    session_id,
                    name.into(),
                    value,
                ))
                .await
                .unwrap();
        }
        store.set_score(session_id, 15).await.unwrap();

        let snapshot = get_snapshot(&state).await.unwrap();
        let by_name = |name: &str| {
            snapshot
                .players
                .iter()
                .find(|p| p.name == name)
                .unwrap()
                .clone()
        };
        assert!(by_name("Alice").eliminated);
        assert!(!by_name("Bob").eliminated); // score == value survives
        assert!(!by_name("Carol").eliminated);
    }

    #[tokio::test]
    async fn ended_session_snapshot_carries_final_score() {
        let target = OffsetDateTime::now_utc() - Duration::hours(3);
        let (state, session_id) = state_with_session(target, false).await;
        let store = state.game_store().await.unwrap();
        store.mark_ended(session_id, 24).await.unwrap();

        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.phase, GamePhase::Ended);
        assert!(snapshot.game_ended);
        assert_eq!(snapshot.final_score, Some(24));
    }

    #[tokio::test]
    async fn missing_capacity_falls_back_to_config_default() {
        let target = OffsetDateTime::now_utc() + Duration::hours(1);
        let (state, _) = state_with_session(target, true).await;

        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.total_players, state.config().total_players());

        let store = state.game_store().await.unwrap();
        store.set_total_players(25).await.unwrap();
        let snapshot = get_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.total_players, 25);
    }
}
