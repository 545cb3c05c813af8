//! DTO definitions for the public snapshot and guess endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dto::validation::validate_participant_name, state::phase::GamePhase};

/// Lower bound accepted for a guessed score.
pub const MIN_GUESS_VALUE: i64 = 0;
/// Upper bound accepted for a guessed score.
pub const MAX_GUESS_VALUE: i64 = 400;

/// Countdown timer state as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameTimerSnapshot {
    /// Scheduled kickoff in RFC 3339 form.
    pub target_date: String,
    /// Whether guesses are still being accepted.
    pub is_active: bool,
}

/// One participant's guess as rendered on the board.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    /// The final score this participant guessed.
    pub score: i64,
    pub winner: bool,
    /// True once the live team score has passed this guess.
    pub eliminated: bool,
}

/// Full game view returned by the snapshot endpoint; the polling client
/// replaces its state wholesale with each one received.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotResponse {
    pub session_id: Uuid,
    pub session_name: String,
    /// Resolved lifecycle phase at the time the snapshot was taken.
    pub phase: GamePhase,
    /// Whether the match itself has kicked off (timer expired or disarmed).
    pub game_started: bool,
    pub game_ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i64>,
    /// Live team score; guesses strictly below it are eliminated.
    pub team_score: i64,
    pub total_players: u32,
    pub game_timer: GameTimerSnapshot,
    pub players: Vec<PlayerSnapshot>,
    /// Cadence (seconds) at which clients should poll for the next snapshot.
    pub poll_interval_secs: u64,
}

/// Payload submitted by a participant to register a guess.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitGuessRequest {
    /// Display name of the participant.
    #[validate(custom(function = validate_participant_name))]
    pub name: String,
    /// Guessed final score.
    #[validate(range(min = 0, max = 400))]
    pub value: i64,
    /// Target session; defaults to the current one when omitted.
    pub session_id: Option<Uuid>,
}

/// Response confirming a stored guess.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuessResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub value: i64,
}
