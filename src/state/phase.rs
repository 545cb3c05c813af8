//! Pure derivation of the game phase and per-guess status.
//!
//! Nothing in here touches storage: the phase is recomputed on every read
//! from the session facts, the clock, and the team score. Two of the facts
//! are latched elsewhere (`started` by the lazy kickoff flip, `ended` by
//! `session_service::end_game`); the phases themselves exist solely as the
//! result of [`resolve_phase`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::dao::models::SessionEntity;

/// Derived lifecycle stage of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Session exists but the countdown is not armed.
    Scheduled,
    /// Countdown is armed and kickoff is in the future; guesses display live.
    GuessingOpen,
    /// Kickoff has passed; the live score is being tracked.
    InProgress,
    /// The admin latched the end of the game. Terminal.
    Ended,
}

/// Display status of a single guess against the live team score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuessStatus {
    /// Still in the running.
    Active,
    /// The team score passed this guess.
    Eliminated,
    /// Manually crowned by the admin; overrides elimination math.
    Winner,
}

/// Result of a phase resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The derived phase.
    pub phase: GamePhase,
    /// True when the reader that computed this resolution is responsible for
    /// triggering the lazy `is_active -> false` write. The write must be
    /// idempotent: concurrent readers may all see this flag.
    pub deactivate: bool,
}

/// Derive the phase for a session. Rules are evaluated in order, first match
/// wins; the order is load-bearing (an ended session is `Ended` no matter
/// what the timer says).
pub fn resolve_phase(now: OffsetDateTime, session: &SessionEntity) -> Resolution {
    if session.ended {
        return Resolution {
            phase: GamePhase::Ended,
            deactivate: false,
        };
    }

    // `started` is latched by the lazy kickoff flip, which also disarms the
    // timer. Checking it before `is_active` keeps a started session in
    // `InProgress` instead of regressing to `Scheduled` on the next read.
    if session.started {
        return Resolution {
            phase: GamePhase::InProgress,
            deactivate: false,
        };
    }

    if !session.is_active {
        return Resolution {
            phase: GamePhase::Scheduled,
            deactivate: false,
        };
    }

    if now < session.target_start_time {
        return Resolution {
            phase: GamePhase::GuessingOpen,
            deactivate: false,
        };
    }

    Resolution {
        phase: GamePhase::InProgress,
        deactivate: true,
    }
}

/// The "has the game started" rule shared verbatim between the snapshot
/// service and the client sync engine. The countdown disarms itself at
/// kickoff, so a disarmed timer whose target has passed means the game is on.
pub fn game_started(now: OffsetDateTime, target_start_time: OffsetDateTime, is_active: bool) -> bool {
    !is_active && now >= target_start_time
}

/// Compute the display status of one guess. Independent of phase and of the
/// order guesses are listed in; the winner flag always wins over the
/// elimination comparison.
pub fn guess_status(team_score: i64, value: i64, is_winner: bool) -> GuessStatus {
    if is_winner {
        GuessStatus::Winner
    } else if team_score > value {
        GuessStatus::Eliminated
    } else {
        GuessStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;

    fn session(target: OffsetDateTime, is_active: bool, ended: bool) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            name: "Tennessee vs Alabama".into(),
            target_start_time: target,
            is_active,
            is_current: true,
            started: false,
            ended,
            final_score: None,
            created_at: datetime!(2024-10-01 12:00 UTC),
            updated_at: datetime!(2024-10-01 12:00 UTC),
        }
    }

    const KICKOFF: OffsetDateTime = datetime!(2024-10-19 19:30 UTC);

    #[test]
    fn inactive_session_is_scheduled() {
        let resolution = resolve_phase(KICKOFF - time::Duration::hours(2), &session(KICKOFF, false, false));
        assert_eq!(resolution.phase, GamePhase::Scheduled);
        assert!(!resolution.deactivate);
    }

    #[test]
    fn armed_session_before_kickoff_is_guessing_open() {
        let resolution = resolve_phase(KICKOFF - time::Duration::seconds(1), &session(KICKOFF, true, false));
        assert_eq!(resolution.phase, GamePhase::GuessingOpen);
        assert!(!resolution.deactivate);
    }

    #[test]
    fn armed_session_past_kickoff_is_in_progress_and_signals_deactivation() {
        let resolution = resolve_phase(KICKOFF + time::Duration::seconds(5), &session(KICKOFF, true, false));
        assert_eq!(resolution.phase, GamePhase::InProgress);
        assert!(resolution.deactivate);
    }

    #[test]
    fn kickoff_instant_counts_as_started() {
        let resolution = resolve_phase(KICKOFF, &session(KICKOFF, true, false));
        assert_eq!(resolution.phase, GamePhase::InProgress);
    }

    #[test]
    fn started_session_stays_in_progress_after_the_disarm() {
        // The lazy kickoff flip leaves `is_active = false, started = true`;
        // subsequent reads must not fall back to `Scheduled`.
        let mut flipped = session(KICKOFF, false, false);
        flipped.started = true;

        for offset in [time::Duration::seconds(1), time::Duration::hours(3)] {
            let resolution = resolve_phase(KICKOFF + offset, &flipped);
            assert_eq!(resolution.phase, GamePhase::InProgress);
            assert!(!resolution.deactivate);
        }
    }

    #[test]
    fn ended_wins_over_everything() {
        for is_active in [true, false] {
            let resolution = resolve_phase(KICKOFF - time::Duration::hours(1), &session(KICKOFF, is_active, true));
            assert_eq!(resolution.phase, GamePhase::Ended);
            assert!(!resolution.deactivate);
        }
    }

    #[test]
    fn ended_is_terminal_for_fixed_facts() {
        let ended = session(KICKOFF, true, true);
        let mut now = KICKOFF - time::Duration::days(1);
        for _ in 0..48 {
            assert_eq!(resolve_phase(now, &ended).phase, GamePhase::Ended);
            now += time::Duration::hours(1);
        }
    }

    #[test]
    fn started_rule_matches_resolver_step_four() {
        // Before the lazy flip: armed and past target.
        assert!(!game_started(KICKOFF + time::Duration::seconds(5), KICKOFF, true));
        // After the flip: disarmed and past target.
        assert!(game_started(KICKOFF + time::Duration::seconds(5), KICKOFF, false));
        // Disarmed but still counting down: not started, merely unarmed.
        assert!(!game_started(KICKOFF - time::Duration::seconds(5), KICKOFF, false));
    }

    #[test]
    fn elimination_is_a_strict_comparison() {
        assert_eq!(guess_status(15, 10, false), GuessStatus::Eliminated);
        assert_eq!(guess_status(15, 15, false), GuessStatus::Active);
        assert_eq!(guess_status(15, 20, false), GuessStatus::Active);
        assert_eq!(guess_status(0, 0, false), GuessStatus::Active);
    }

    #[test]
    fn winner_flag_overrides_elimination() {
        assert_eq!(guess_status(50, 10, true), GuessStatus::Winner);
        assert_eq!(guess_status(0, 10, true), GuessStatus::Winner);
    }
}
