//! Session lifecycle: creation, timer control and game end.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::{
    dao::{
        game_store::EndOutcome,
        models::{LEGACY_SESSION_ID, SessionEntity},
    },
    dto::{
        admin::{CreateSessionRequest, EndGameRequest, EndGameResponse, SessionSummary, SetTimerRequest},
        format_timestamp,
    },
    error::ServiceError,
    state::SharedState,
};

impl From<SessionEntity> for SessionSummary {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            target_start_time: format_timestamp(value.target_start_time),
            is_active: value.is_active,
            is_current: value.is_current,
            started: value.started,
            ended: value.ended,
            final_score: value.final_score,
        }
    }
}

fn parse_target_date(raw: &str) -> Result<OffsetDateTime, ServiceError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| {
        ServiceError::InvalidInput(format!("target date must be RFC 3339 (`{raw}`): {err}"))
    })
}

/// Open a new guessing session and make it current.
///
/// Any previous current session is demoted, unscoped legacy guesses are wiped
/// and the new session's score starts at 0.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "session name must not be blank".into(),
        ));
    }
    let target = parse_target_date(&request.target_date)?;

    let store = state.require_game_store().await?;
    let session = SessionEntity::new(name.to_owned(), target);
    let summary: SessionSummary = session.clone().into();

    store.create_current_session(session).await?;
    let removed = store.clear_guesses(LEGACY_SESSION_ID).await?;
    store.set_score(summary.id, 0).await?;

    info!(session_id = %summary.id, legacy_guesses_removed = removed, "opened new guessing session");
    Ok(summary)
}

/// Return the current session, if one exists.
pub async fn current_session(state: &SharedState) -> Result<SessionSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let session = store
        .current_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no current session".into()))?;
    Ok(session.into())
}

/// Reschedule the countdown and arm or disarm it, as one atomic write so
/// readers never observe a stale date paired with a fresh flag.
pub async fn set_timer(
    state: &SharedState,
    request: SetTimerRequest,
) -> Result<SessionSummary, ServiceError> {
    let target = parse_target_date(&request.target_date)?;

    let store = state.require_game_store().await?;
    let session = store
        .current_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no current session".into()))?;
    if session.ended {
        return Err(ServiceError::AlreadyEnded);
    }

    if !store
        .update_timer(session.id, target, request.is_active)
        .await?
    {
        // The store refuses the write for ended sessions too, so a game that
        // ended between the read above and this write cannot be re-armed.
        return match store.find_session(session.id).await? {
            Some(_) => Err(ServiceError::AlreadyEnded),
            None => Err(ServiceError::NotFound(format!(
                "session `{}` not found",
                session.id
            ))),
        };
    }

    info!(session_id = %session.id, is_active = request.is_active, "timer updated");

    let updated = store
        .find_session(session.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{}` not found", session.id)))?;
    Ok(updated.into())
}

/// Close the current game with its final score.
///
/// Ending is guarded: once latched, a second call fails with `AlreadyEnded`
/// and the recorded final score is never overwritten.
pub async fn end_game(
    state: &SharedState,
    request: EndGameRequest,
) -> Result<EndGameResponse, ServiceError> {
    if request.final_score < 0 {
        return Err(ServiceError::InvalidInput(
            "final score must be non-negative".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let session = store
        .current_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no current session".into()))?;

    match store.mark_ended(session.id, request.final_score).await? {
        EndOutcome::Ended => {
            info!(session_id = %session.id, final_score = request.final_score, "game ended");
            Ok(EndGameResponse {
                session_id: session.id,
                final_score: request.final_score,
            })
        }
        EndOutcome::AlreadyEnded => Err(ServiceError::AlreadyEnded),
        EndOutcome::NotFound => Err(ServiceError::NotFound(format!(
            "session `{}` not found",
            session.id
        ))),
    }
}
