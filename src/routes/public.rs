use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{GuessResponse, SnapshotResponse, SubmitGuessRequest},
    error::AppError,
    services::{
        guess_service::{self, Requester},
        snapshot_service,
    },
    state::SharedState,
};

const PARTICIPANT_HEADER: &str = "x-participant";

/// Public endpoints used by the party page: polling and guess management.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/public/snapshot", get(get_snapshot))
        .route("/public/guesses", post(submit_guess))
        .route("/public/guesses/{id}", delete(delete_guess))
}

/// Return the consolidated game view clients poll for.
#[utoipa::path(
    get,
    path = "/public/snapshot",
    tag = "public",
    responses(
        (status = 200, description = "Current game snapshot", body = SnapshotResponse),
        (status = 404, description = "No current session"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_snapshot(
    State(state): State<SharedState>,
) -> Result<Json<SnapshotResponse>, AppError> {
    Ok(Json(snapshot_service::get_snapshot(&state).await?))
}

/// Register a participant's guess.
#[utoipa::path(
    post,
    path = "/public/guesses",
    tag = "public",
    request_body = SubmitGuessRequest,
    responses(
        (status = 200, description = "Guess registered", body = GuessResponse),
        (status = 400, description = "Invalid name or value"),
        (status = 409, description = "Duplicate value or participant")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitGuessRequest>>,
) -> Result<Json<GuessResponse>, AppError> {
    Ok(Json(guess_service::submit_guess(&state, payload).await?))
}

/// Remove a guess; only its owner (via the `X-Participant` header) may do so.
#[utoipa::path(
    delete,
    path = "/public/guesses/{id}",
    tag = "public",
    params(
        ("id" = String, Path, description = "Identifier of the guess to remove"),
        ("X-Participant" = String, Header, description = "Name the guess was submitted under")
    ),
    responses(
        (status = 204, description = "Guess removed"),
        (status = 403, description = "Requester does not own the guess"),
        (status = 404, description = "Guess not found")
    )
)]
pub async fn delete_guess(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let participant = headers
        .get(PARTICIPANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::BadRequest("missing participant header `X-Participant`".into())
        })?;

    guess_service::delete_guess(&state, id, Requester::Participant(participant)).await?;
    Ok(StatusCode::NO_CONTENT)
}
