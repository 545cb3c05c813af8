use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Designated session id for legacy/unscoped guesses. Guesses always carry a
/// session id; rows that predate session scoping live under this one.
pub const LEGACY_SESSION_ID: Uuid = Uuid::nil();

/// A game session tied to one real-world scheduled event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Display label, e.g. "Tennessee vs Alabama".
    pub name: String,
    /// Instant (UTC) at which guessing closes and the game counts as started.
    #[serde(with = "time::serde::rfc3339")]
    pub target_start_time: OffsetDateTime,
    /// Whether the countdown is armed and the session accepts guesses.
    pub is_active: bool,
    /// At most one session is current; new guesses attach to it.
    pub is_current: bool,
    /// Monotonic: flips to true at most once, when kickoff is first observed.
    pub started: bool,
    /// Monotonic: latched by ending the game. Terminal.
    pub ended: bool,
    /// Recorded only when `ended` flips to true; immutable afterwards.
    pub final_score: Option<i64>,
    /// Creation timestamp for auditing/debugging.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last time the session row was updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SessionEntity {
    /// Build a freshly created session: current, disarmed, unstarted.
    pub fn new(name: String, target_start_time: OffsetDateTime) -> Self {
        let timestamp = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            name,
            target_start_time,
            is_active: false,
            is_current: true,
            started: false,
            ended: false,
            final_score: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

/// One participant's prediction of the final team score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessEntity {
    /// Primary key, assigned on creation.
    pub id: Uuid,
    /// Session this guess belongs to (never null; see [`LEGACY_SESSION_ID`]).
    pub session_id: Uuid,
    /// Owning identity; doubles as the display name.
    pub participant: String,
    /// Predicted score, unique within the session.
    pub value: i64,
    /// Set manually by the admin once the session ends.
    pub is_winner: bool,
    /// Creation timestamp; guesses list in insertion order.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl GuessEntity {
    /// Build a new guess row for the given session.
    pub fn new(session_id: Uuid, participant: String, value: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            participant,
            value,
            is_winner: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Per-participant career statistics, updated best-effort on winner toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsEntity {
    /// Identity the statistics belong to.
    pub participant: String,
    /// Number of sessions this participant has submitted a guess in.
    pub games_played: u64,
    /// Number of times the participant was crowned winner.
    pub wins: u64,
    /// Closest winning guess recorded so far.
    pub best_score: Option<i64>,
}
