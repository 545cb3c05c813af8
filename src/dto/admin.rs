//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimal projection of a session when listed for administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    /// Scheduled kickoff in RFC 3339 form.
    pub target_start_time: String,
    pub is_active: bool,
    pub is_current: bool,
    pub started: bool,
    pub ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i64>,
}

/// Payload describing a new guessing session to open.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub name: String,
    /// Scheduled kickoff in RFC 3339 form.
    pub target_date: String,
}

/// Request to reschedule or arm/disarm the countdown timer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTimerRequest {
    /// New kickoff in RFC 3339 form.
    pub target_date: String,
    pub is_active: bool,
}

/// Request to set the live team score.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetScoreRequest {
    pub value: i64,
}

/// Request to set the advertised party capacity.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTotalPlayersRequest {
    pub value: u32,
}

/// Request to close the game with its final score.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EndGameRequest {
    pub final_score: i64,
}

/// Confirmation that the game was closed.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndGameResponse {
    pub session_id: Uuid,
    pub final_score: i64,
}

/// Request to toggle the winner flag on a guess.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetWinnerRequest {
    pub is_winner: bool,
}

/// Response reporting how many guesses an admin wipe removed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearGuessesResponse {
    pub removed: u64,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}
