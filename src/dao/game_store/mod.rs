pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GuessEntity, SessionEntity, StatsEntity};
use crate::dao::storage::StorageResult;

/// Outcome of an atomic guess insertion. The duplicate checks and the insert
/// happen inside one storage-level critical section (unique constraint or
/// store lock), never as an application-level check-then-act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessInsert {
    /// The guess was inserted.
    Inserted,
    /// Another guess in the same session already holds this value.
    DuplicateValue,
    /// This participant already guessed in this session.
    DuplicateParticipant,
}

/// Outcome of latching a session's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// The session was ended by this call; the final score is now immutable.
    Ended,
    /// The session had already been ended; nothing was changed.
    AlreadyEnded,
    /// No session with that id exists.
    NotFound,
}

/// Abstraction over the persistence layer: sessions, guesses, the team
/// score, and best-effort participant statistics.
pub trait GameStore: Send + Sync {
    // Session ops. Each call is atomic on its own; no cross-entity
    // transaction is required by callers.

    /// Insert a new current session, demoting any previously current one.
    fn create_current_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// The session new guesses attach to, if any.
    fn current_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Look up a session by id.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Persist the countdown target and the active flag together, so no
    /// reader can observe a fresh target paired with a stale flag. Refuses
    /// ended sessions (returns `false`, same as a missing session), so an
    /// ended game can never be re-armed.
    fn update_timer(
        &self,
        id: Uuid,
        target_start_time: OffsetDateTime,
        is_active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Record that kickoff was observed: `is_active = false, started = true`.
    /// Idempotent; concurrent redundant calls are harmless.
    fn mark_started(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Latch `ended = true` with the final score, forcing `is_active = false`.
    /// The guard against double-ending lives here so it holds across
    /// concurrent server processes.
    fn mark_ended(&self, id: Uuid, final_score: i64) -> BoxFuture<'static, StorageResult<EndOutcome>>;

    // Guess ops.

    /// Insert with the per-session uniqueness checks, atomically.
    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<GuessInsert>>;
    /// All guesses of a session in insertion order.
    fn list_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;
    /// Look up a guess by id.
    fn find_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GuessEntity>>>;
    /// Delete one guess; false when it did not exist.
    fn delete_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete every guess of a session, returning how many were removed.
    fn clear_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;
    /// Set or clear the winner flag; false when the guess did not exist.
    fn set_winner(&self, id: Uuid, is_winner: bool) -> BoxFuture<'static, StorageResult<bool>>;

    // Score ops (upsert semantics; a missing row reads as absent and callers
    // treat it as 0).

    /// Current team score for a session.
    fn score(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Option<i64>>>;
    /// Upsert the team score for a session.
    fn set_score(&self, session_id: Uuid, value: i64) -> BoxFuture<'static, StorageResult<()>>;

    // Party-capacity singleton.

    /// Configured number of participant slots, if an admin has set one.
    fn total_players(&self) -> BoxFuture<'static, StorageResult<Option<u32>>>;
    /// Upsert the number of participant slots.
    fn set_total_players(&self, value: u32) -> BoxFuture<'static, StorageResult<()>>;

    // Stats ops. Best-effort: not transactional with guess/winner updates.

    /// Bump the games-played counter for a participant.
    fn increment_games_played(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Bump the win counter for a participant.
    fn increment_wins(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Record a winning guess value if it beats the stored best.
    fn record_best_score(&self, participant: &str, value: i64) -> BoxFuture<'static, StorageResult<()>>;
    /// Read back a participant's statistics.
    fn stats(&self, participant: &str) -> BoxFuture<'static, StorageResult<Option<StatsEntity>>>;

    // Backend health.

    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a broken backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
