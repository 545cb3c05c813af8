use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::admin::{
        ActionResponse, ClearGuessesResponse, CreateSessionRequest, EndGameRequest,
        EndGameResponse, SessionSummary, SetScoreRequest, SetTimerRequest, SetTotalPlayersRequest,
        SetWinnerRequest,
    },
    error::AppError,
    services::{
        guess_service::{self, Requester},
        score_service, session_service,
    },
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only management endpoints for driving the game.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/sessions", post(create_session))
        .route("/admin/sessions/current", get(current_session))
        .route("/admin/timer", post(set_timer))
        .route("/admin/score", post(set_score))
        .route("/admin/players/total", post(set_total_players))
        .route("/admin/game/end", post(end_game))
        .route("/admin/guesses/{id}/winner", post(set_winner))
        .route("/admin/guesses/{id}", delete(delete_guess))
        .route("/admin/guesses/clear", post(clear_guesses))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Open a new guessing session and make it current.
#[utoipa::path(
    post,
    path = "/admin/sessions",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    request_body = CreateSessionRequest,
    responses((status = 200, description = "Session created", body = SessionSummary))
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::create_session(&state, payload).await?))
}

/// Retrieve the current session.
#[utoipa::path(
    get,
    path = "/admin/sessions/current",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    responses(
        (status = 200, description = "Current session", body = SessionSummary),
        (status = 404, description = "No current session")
    )
)]
pub async fn current_session(
    State(state): State<SharedState>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::current_session(&state).await?))
}

/// Reschedule the countdown and arm or disarm it.
#[utoipa::path(
    post,
    path = "/admin/timer",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    request_body = SetTimerRequest,
    responses((status = 200, description = "Timer updated", body = SessionSummary))
)]
pub async fn set_timer(
    State(state): State<SharedState>,
    Json(payload): Json<SetTimerRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::set_timer(&state, payload).await?))
}

/// Set the live team score.
#[utoipa::path(
    post,
    path = "/admin/score",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    request_body = SetScoreRequest,
    responses((status = 200, description = "Score updated", body = ActionResponse))
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Json(payload): Json<SetScoreRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    score_service::set_score(&state, payload).await?;
    Ok(Json(ActionResponse {
        message: "score updated".into(),
    }))
}

/// Set the advertised party capacity.
#[utoipa::path(
    post,
    path = "/admin/players/total",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    request_body = SetTotalPlayersRequest,
    responses((status = 200, description = "Capacity updated", body = ActionResponse))
)]
pub async fn set_total_players(
    State(state): State<SharedState>,
    Json(payload): Json<SetTotalPlayersRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    score_service::set_total_players(&state, payload).await?;
    Ok(Json(ActionResponse {
        message: "total players updated".into(),
    }))
}

/// Close the game with its final score. A second call is rejected.
#[utoipa::path(
    post,
    path = "/admin/game/end",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    request_body = EndGameRequest,
    responses(
        (status = 200, description = "Game ended", body = EndGameResponse),
        (status = 409, description = "Game already ended")
    )
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Json(payload): Json<EndGameRequest>,
) -> Result<Json<EndGameResponse>, AppError> {
    Ok(Json(session_service::end_game(&state, payload).await?))
}

/// Toggle the winner flag on a guess.
#[utoipa::path(
    post,
    path = "/admin/guesses/{id}/winner",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration"),
    ("id" = String, Path, description = "Identifier of the guess")),
    request_body = SetWinnerRequest,
    responses((status = 200, description = "Winner flag updated", body = ActionResponse))
)]
pub async fn set_winner(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetWinnerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    guess_service::set_winner(&state, id, payload.is_winner).await?;
    Ok(Json(ActionResponse {
        message: "winner flag updated".into(),
    }))
}

/// Remove any guess by its identifier.
#[utoipa::path(
    delete,
    path = "/admin/guesses/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration"),
    ("id" = String, Path, description = "Identifier of the guess to delete")),
    responses((status = 204, description = "Guess deleted"))
)]
pub async fn delete_guess(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    guess_service::delete_guess(&state, id, Requester::Admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Wipe every guess from the current and legacy sessions.
#[utoipa::path(
    post,
    path = "/admin/guesses/clear",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token from the server configuration")),
    responses((status = 200, description = "Guesses cleared", body = ClearGuessesResponse))
)]
pub async fn clear_guesses(
    State(state): State<SharedState>,
) -> Result<Json<ClearGuessesResponse>, AppError> {
    let removed = guess_service::clear_guesses(&state).await?;
    Ok(Json(ClearGuessesResponse { removed }))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "no admin token configured on the server".into(),
        )),
    }
}
