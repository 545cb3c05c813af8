use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Gameday Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_snapshot,
        crate::routes::public::submit_guess,
        crate::routes::public::delete_guess,
        crate::routes::admin::create_session,
        crate::routes::admin::current_session,
        crate::routes::admin::set_timer,
        crate::routes::admin::set_score,
        crate::routes::admin::set_total_players,
        crate::routes::admin::end_game,
        crate::routes::admin::set_winner,
        crate::routes::admin::delete_guess,
        crate::routes::admin::clear_guesses,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::SnapshotResponse,
            crate::dto::game::GameTimerSnapshot,
            crate::dto::game::PlayerSnapshot,
            crate::dto::game::SubmitGuessRequest,
            crate::dto::game::GuessResponse,
            crate::dto::admin::SessionSummary,
            crate::dto::admin::CreateSessionRequest,
            crate::dto::admin::SetTimerRequest,
            crate::dto::admin::SetScoreRequest,
            crate::dto::admin::SetTotalPlayersRequest,
            crate::dto::admin::EndGameRequest,
            crate::dto::admin::EndGameResponse,
            crate::dto::admin::SetWinnerRequest,
            crate::dto::admin::ClearGuessesResponse,
            crate::dto::admin::ActionResponse,
            crate::state::phase::GamePhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Participant-facing snapshot and guess endpoints"),
        (name = "admin", description = "Token-protected game management endpoints"),
    )
)]
pub struct ApiDoc;
