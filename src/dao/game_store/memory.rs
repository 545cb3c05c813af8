//! In-memory [`GameStore`] used by tests and as the dev fallback when the
//! `mongo-store` feature is disabled.
//!
//! A single mutex serializes every operation, which makes the
//! duplicate-check-plus-insert of [`GameStore::insert_guess`] trivially
//! atomic: two concurrent submissions of the same value can never both pass
//! the check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::game_store::{EndOutcome, GameStore, GuessInsert};
use crate::dao::models::{GuessEntity, SessionEntity, StatsEntity};
use crate::dao::storage::StorageResult;

#[derive(Default)]
struct MemoryInner {
    sessions: IndexMap<Uuid, SessionEntity>,
    // IndexMap keeps guess insertion order, which is the listing order.
    guesses: IndexMap<Uuid, GuessEntity>,
    scores: HashMap<Uuid, i64>,
    total_players: Option<u32>,
    stats: HashMap<String, StatsEntity>,
}

/// Mutex-backed store holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // Lock poisoning only happens if a holder panicked; propagating the
        // panic here is the least surprising behavior for a test store.
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

impl GameStore for MemoryGameStore {
    fn create_current_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            for existing in inner.sessions.values_mut() {
                existing.is_current = false;
            }
            inner.sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn current_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.sessions.values().find(|s| s.is_current).cloned())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.sessions.get(&id).cloned())
        })
    }

    fn update_timer(
        &self,
        id: Uuid,
        target_start_time: OffsetDateTime,
        is_active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(session) = inner.sessions.get_mut(&id) else {
                return Ok(false);
            };
            if session.ended {
                return Ok(false);
            }
            session.target_start_time = target_start_time;
            session.is_active = is_active;
            session.updated_at = OffsetDateTime::now_utc();
            Ok(true)
        })
    }

    fn mark_started(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(session) = inner.sessions.get_mut(&id) else {
                return Ok(false);
            };
            session.is_active = false;
            session.started = true;
            session.updated_at = OffsetDateTime::now_utc();
            Ok(true)
        })
    }

    fn mark_ended(&self, id: Uuid, final_score: i64) -> BoxFuture<'static, StorageResult<EndOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(session) = inner.sessions.get_mut(&id) else {
                return Ok(EndOutcome::NotFound);
            };
            if session.ended {
                return Ok(EndOutcome::AlreadyEnded);
            }
            session.ended = true;
            session.is_active = false;
            session.final_score = Some(final_score);
            session.updated_at = OffsetDateTime::now_utc();
            Ok(EndOutcome::Ended)
        })
    }

    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<GuessInsert>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let mut same_session = inner
                .guesses
                .values()
                .filter(|g| g.session_id == guess.session_id);
            if same_session.clone().any(|g| g.value == guess.value) {
                return Ok(GuessInsert::DuplicateValue);
            }
            if same_session.any(|g| g.participant == guess.participant) {
                return Ok(GuessInsert::DuplicateParticipant);
            }
            inner.guesses.insert(guess.id, guess);
            Ok(GuessInsert::Inserted)
        })
    }

    fn list_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner
                .guesses
                .values()
                .filter(|g| g.session_id == session_id)
                .cloned()
                .collect())
        })
    }

    fn find_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.guesses.get(&id).cloned())
        })
    }

    fn delete_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            Ok(inner.guesses.shift_remove(&id).is_some())
        })
    }

    fn clear_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let before = inner.guesses.len();
            inner.guesses.retain(|_, g| g.session_id != session_id);
            Ok((before - inner.guesses.len()) as u64)
        })
    }

    fn set_winner(&self, id: Uuid, is_winner: bool) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(guess) = inner.guesses.get_mut(&id) else {
                return Ok(false);
            };
            guess.is_winner = is_winner;
            Ok(true)
        })
    }

    fn score(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Option<i64>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.scores.get(&session_id).copied())
        })
    }

    fn set_score(&self, session_id: Uuid, value: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            inner.scores.insert(session_id, value);
            Ok(())
        })
    }

    fn total_players(&self) -> BoxFuture<'static, StorageResult<Option<u32>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.total_players)
        })
    }

    fn set_total_players(&self, value: u32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            inner.total_players = Some(value);
            Ok(())
        })
    }

    fn increment_games_played(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            let mut inner = store.lock();
            let entry = inner.stats.entry(participant.clone()).or_insert_with(|| StatsEntity {
                participant,
                ..StatsEntity::default()
            });
            entry.games_played += 1;
            Ok(())
        })
    }

    fn increment_wins(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            let mut inner = store.lock();
            let entry = inner.stats.entry(participant.clone()).or_insert_with(|| StatsEntity {
                participant,
                ..StatsEntity::default()
            });
            entry.wins += 1;
            Ok(())
        })
    }

    fn record_best_score(&self, participant: &str, value: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            let mut inner = store.lock();
            let entry = inner.stats.entry(participant.clone()).or_insert_with(|| StatsEntity {
                participant,
                ..StatsEntity::default()
            });
            entry.best_score = Some(entry.best_score.map_or(value, |best| best.max(value)));
            Ok(())
        })
    }

    fn stats(&self, participant: &str) -> BoxFuture<'static, StorageResult<Option<StatsEntity>>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner.stats.get(&participant).cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn session(name: &str) -> SessionEntity {
        SessionEntity::new(name.into(), datetime!(2024-10-19 19:30 UTC))
    }

    #[tokio::test]
    async fn at_most_one_current_session() {
        let store = MemoryGameStore::new();
        for name in ["Week 1", "Week 2", "Week 3"] {
            store.create_current_session(session(name)).await.unwrap();
        }

        let current = store.current_session().await.unwrap().unwrap();
        assert_eq!(current.name, "Week 3");

        let inner = store.lock();
        assert_eq!(inner.sessions.values().filter(|s| s.is_current).count(), 1);
    }

    #[tokio::test]
    async fn duplicate_value_rejected_within_session_only() {
        let store = MemoryGameStore::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();

        assert_eq!(
            store.insert_guess(GuessEntity::new(s1, "amy".into(), 21)).await.unwrap(),
            GuessInsert::Inserted
        );
        assert_eq!(
            store.insert_guess(GuessEntity::new(s1, "ben".into(), 21)).await.unwrap(),
            GuessInsert::DuplicateValue
        );
        // Same value in a different session is fine.
        assert_eq!(
            store.insert_guess(GuessEntity::new(s2, "ben".into(), 21)).await.unwrap(),
            GuessInsert::Inserted
        );
    }

    #[tokio::test]
    async fn one_guess_per_participant_per_session() {
        let store = MemoryGameStore::new();
        let session_id = Uuid::new_v4();
        store
            .insert_guess(GuessEntity::new(session_id, "amy".into(), 10))
            .await
            .unwrap();
        assert_eq!(
            store
                .insert_guess(GuessEntity::new(session_id, "amy".into(), 11))
                .await
                .unwrap(),
            GuessInsert::DuplicateParticipant
        );
    }

    #[tokio::test]
    async fn concurrent_same_value_submissions_one_wins() {
        let store = MemoryGameStore::new();
        let session_id = Uuid::new_v4();

        let first = store.insert_guess(GuessEntity::new(session_id, "amy".into(), 17));
        let second = store.insert_guess(GuessEntity::new(session_id, "ben".into(), 17));
        let (a, b) = tokio::join!(first, second);

        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(outcomes.iter().filter(|o| **o == GuessInsert::Inserted).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == GuessInsert::DuplicateValue).count(),
            1
        );
    }

    #[tokio::test]
    async fn guesses_list_in_insertion_order() {
        let store = MemoryGameStore::new();
        let session_id = Uuid::new_v4();
        for (name, value) in [("amy", 30), ("ben", 10), ("cal", 20)] {
            store
                .insert_guess(GuessEntity::new(session_id, name.into(), value))
                .await
                .unwrap();
        }

        let listed = store.list_guesses(session_id).await.unwrap();
        let names: Vec<_> = listed.iter().map(|g| g.participant.as_str()).collect();
        assert_eq!(names, ["amy", "ben", "cal"]);
    }

    #[tokio::test]
    async fn mark_ended_guards_against_double_ending() {
        let store = MemoryGameStore::new();
        let s = session("Week 1");
        let id = s.id;
        store.create_current_session(s).await.unwrap();

        assert_eq!(store.mark_ended(id, 27).await.unwrap(), EndOutcome::Ended);
        assert_eq!(store.mark_ended(id, 30).await.unwrap(), EndOutcome::AlreadyEnded);

        let ended = store.find_session(id).await.unwrap().unwrap();
        assert!(ended.ended);
        assert!(!ended.is_active);
        assert_eq!(ended.final_score, Some(27));

        assert_eq!(
            store.mark_ended(Uuid::new_v4(), 1).await.unwrap(),
            EndOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn update_timer_refuses_ended_sessions() {
        let store = MemoryGameStore::new();
        let s = session("Week 1");
        let id = s.id;
        store.create_current_session(s).await.unwrap();
        store.mark_ended(id, 27).await.unwrap();

        let written = store
            .update_timer(id, datetime!(2024-10-26 19:30 UTC), true)
            .await
            .unwrap();
        assert!(!written);

        let ended = store.find_session(id).await.unwrap().unwrap();
        assert!(!ended.is_active);
        assert_eq!(ended.target_start_time, datetime!(2024-10-19 19:30 UTC));
    }

    #[tokio::test]
    async fn mark_started_is_idempotent() {
        let store = MemoryGameStore::new();
        let mut s = session("Week 1");
        s.is_active = true;
        let id = s.id;
        store.create_current_session(s).await.unwrap();

        assert!(store.mark_started(id).await.unwrap());
        let after_first = store.find_session(id).await.unwrap().unwrap();
        assert!(store.mark_started(id).await.unwrap());
        let after_second = store.find_session(id).await.unwrap().unwrap();

        assert!(!after_first.is_active);
        assert!(after_first.started);
        assert_eq!(after_first.is_active, after_second.is_active);
        assert_eq!(after_first.started, after_second.started);
    }

    #[tokio::test]
    async fn score_upserts_and_reads_back() {
        let store = MemoryGameStore::new();
        let session_id = Uuid::new_v4();
        assert_eq!(store.score(session_id).await.unwrap(), None);
        store.set_score(session_id, 7).await.unwrap();
        store.set_score(session_id, 14).await.unwrap();
        assert_eq!(store.score(session_id).await.unwrap(), Some(14));
    }

    #[tokio::test]
    async fn stats_accumulate() {
        let store = MemoryGameStore::new();
        store.increment_games_played("amy").await.unwrap();
        store.increment_games_played("amy").await.unwrap();
        store.increment_wins("amy").await.unwrap();
        store.record_best_score("amy", 24).await.unwrap();
        store.record_best_score("amy", 17).await.unwrap();

        let stats = store.stats("amy").await.unwrap().unwrap();
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.best_score, Some(24));
    }
}
