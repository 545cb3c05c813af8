//! The polling sync engine and its locally derived game view.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::game::{SnapshotResponse, SubmitGuessRequest},
    state::phase::{self, GamePhase, GuessStatus},
    sync::{SnapshotSource, SubmitError, SyncError},
};

/// One guess as the client renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub score: i64,
    pub winner: bool,
    pub eliminated: bool,
    /// True for an optimistic local append the server has not confirmed yet.
    pub pending: bool,
}

/// Everything the client renders, derived from the last adopted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub session_id: Uuid,
    pub session_name: String,
    pub phase: GamePhase,
    /// Derived locally with the same rule the server uses, so the countdown
    /// flips to "started" between polls without waiting for the server.
    pub game_started: bool,
    pub game_ended: bool,
    pub final_score: Option<i64>,
    pub team_score: i64,
    pub total_players: u32,
    pub target_date: OffsetDateTime,
    pub timer_active: bool,
    pub players: Vec<PlayerView>,
}

struct ViewState {
    view: Option<GameView>,
    /// Receipt sequence of the snapshot currently adopted. Snapshots received
    /// earlier never replace one received later, whatever order their
    /// requests were issued in.
    last_applied: u64,
}

/// Client-side sync engine: polls snapshots, derives the view, submits
/// guesses optimistically.
pub struct SyncEngine {
    source: Arc<dyn SnapshotSource>,
    receipts: AtomicU64,
    state: Mutex<ViewState>,
}

impl SyncEngine {
    /// Build an engine over the given snapshot source.
    pub fn new(source: Arc<dyn SnapshotSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            receipts: AtomicU64::new(0),
            state: Mutex::new(ViewState {
                view: None,
                last_applied: 0,
            }),
        })
    }

    /// Latest derived view, if any snapshot has been adopted yet.
    pub fn view(&self) -> Option<GameView> {
        self.lock().view.clone()
    }

    /// Whether the adopted view says the game is over.
    pub fn game_ended(&self) -> bool {
        self.lock().view.as_ref().is_some_and(|view| view.game_ended)
    }

    /// Fetch one snapshot and adopt it (last received wins).
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let snapshot = self.source.fetch_snapshot().await?;
        let seq = self.receipts.fetch_add(1, Ordering::SeqCst) + 1;
        self.adopt(snapshot, seq)
    }

    /// Replace the view with a snapshot received as receipt number `seq`.
    /// A snapshot older (by receipt) than the adopted one is discarded.
    fn adopt(&self, snapshot: SnapshotResponse, seq: u64) -> Result<(), SyncError> {
        let view = derive_view(&snapshot, OffsetDateTime::now_utc())?;
        let mut guard = self.lock();
        if seq <= guard.last_applied {
            return Ok(());
        }
        guard.last_applied = seq;
        guard.view = Some(view);
        Ok(())
    }

    /// Submit a guess, appending it locally before the server confirms.
    ///
    /// On rejection the optimistic entry is rolled back and the specific
    /// error is returned; on success the entry stays pending until the next
    /// snapshot replaces the view with the server's copy.
    pub async fn submit_guess(&self, name: &str, value: i64) -> Result<(), SubmitError> {
        let pending_id = Uuid::new_v4();
        let session_id = {
            let mut guard = self.lock();
            match guard.view.as_mut() {
                Some(view) => {
                    let status = phase::guess_status(view.team_score, value, false);
                    view.players.push(PlayerView {
                        id: pending_id,
                        name: name.to_owned(),
                        score: value,
                        winner: false,
                        eliminated: status == GuessStatus::Eliminated,
                        pending: true,
                    });
                    Some(view.session_id)
                }
                None => None,
            }
        };

        let request = SubmitGuessRequest {
            name: name.to_owned(),
            value,
            session_id,
        };

        match self.source.submit_guess(request).await {
            Ok(confirmed) => {
                let mut guard = self.lock();
                if let Some(view) = guard.view.as_mut() {
                    if let Some(entry) = view.players.iter_mut().find(|p| p.id == pending_id) {
                        entry.id = confirmed.id;
                    }
                }
                Ok(())
            }
            Err(err) => {
                let mut guard = self.lock();
                if let Some(view) = guard.view.as_mut() {
                    view.players.retain(|p| p.id != pending_id);
                }
                Err(err)
            }
        }
    }

    /// Start fixed-interval polling. Polls never overlap: the next tick only
    /// fires after the previous refresh completed. The loop exits when the
    /// game ends or the handle stops it.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let engine = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Consume the immediate first tick so the first poll happens one
            // period after start, matching the fixed cadence.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = engine.refresh().await {
                            warn!(error = %err, "snapshot poll failed");
                        }
                        if engine.game_ended() {
                            break;
                        }
                    }
                }
            }
        });

        PollHandle {
            stop: stop_tx,
            task,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().expect("sync engine state mutex poisoned")
    }
}

/// Handle to a running poll loop. Stopping is idempotent; dropping the handle
/// also cancels the loop so no timer outlives its owner.
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling. Calling this on an already-stopped loop is a no-op.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Whether the poll loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

/// Turn a wire snapshot into the rendered view, recomputing `game_started`
/// and every elimination locally from the fresh facts.
fn derive_view(snapshot: &SnapshotResponse, now: OffsetDateTime) -> Result<GameView, SyncError> {
    let target_date = OffsetDateTime::parse(&snapshot.game_timer.target_date, &Rfc3339)
        .map_err(|err| SyncError::Decode(format!("bad target date: {err}")))?;

    let players = snapshot
        .players
        .iter()
        .map(|player| {
            let status = phase::guess_status(snapshot.team_score, player.score, player.winner);
            PlayerView {
                id: player.id,
                name: player.name.clone(),
                score: player.score,
                winner: status == GuessStatus::Winner,
                eliminated: status == GuessStatus::Eliminated,
                pending: false,
            }
        })
        .collect();

    Ok(GameView {
        session_id: snapshot.session_id,
        session_name: snapshot.session_name.clone(),
        phase: snapshot.phase,
        game_started: phase::game_started(now, target_date, snapshot.game_timer.is_active),
        game_ended: snapshot.game_ended,
        final_score: snapshot.final_score,
        team_score: snapshot.team_score,
        total_players: snapshot.total_players,
        target_date,
        timer_active: snapshot.game_timer.is_active,
        players,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::atomic::AtomicUsize,
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::dto::game::{GameTimerSnapshot, GuessResponse, PlayerSnapshot};

    fn snapshot(team_score: i64, ended: bool) -> SnapshotResponse {
        SnapshotResponse {
            session_id: Uuid::new_v4(),
            session_name: "Final".into(),
            phase: if ended {
                GamePhase::Ended
            } else {
                GamePhase::InProgress
            },
            game_started: true,
            game_ended: ended,
            final_score: ended.then_some(team_score),
            team_score,
            total_players: 10,
            game_timer: GameTimerSnapshot {
                target_date: "2020-01-01T18:00:00Z".into(),
                is_active: false,
            },
            players: vec![
                PlayerSnapshot {
                    id: Uuid::new_v4(),
                    name: "Alice".into(),
                    score: 10,
                    winner: false,
                    eliminated: false,
                },
                PlayerSnapshot {
                    id: Uuid::new_v4(),
                    name: "Bob".into(),
                    score: 30,
                    winner: false,
                    eliminated: false,
                },
            ],
            poll_interval_secs: 10,
        }
    }

    /// Scripted source: pops queued snapshots, repeating the last one when
    /// the queue runs dry, and answers submissions from a queue of results.
    struct ScriptedSource {
        snapshots: Mutex<VecDeque<SnapshotResponse>>,
        last: Mutex<Option<SnapshotResponse>>,
        submit_results: Mutex<VecDeque<Result<GuessResponse, SubmitError>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(snapshots: Vec<SnapshotResponse>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(snapshots.into()),
                last: Mutex::new(None),
                submit_results: Mutex::new(VecDeque::new()),
                fetches: AtomicUsize::new(0),
            })
        }

        fn queue_submit(&self, result: Result<GuessResponse, SubmitError>) {
            self.submit_results.lock().unwrap().push_back(result);
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl SnapshotSource for ScriptedSource {
        fn fetch_snapshot(&self) -> BoxFuture<'static, Result<SnapshotResponse, SyncError>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut queue = self.snapshots.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                match queue.pop_front() {
                    Some(snapshot) => {
                        *last = Some(snapshot.clone());
                        Some(snapshot)
                    }
                    None => last.clone(),
                }
            };
            Box::pin(async move {
                next.ok_or_else(|| SyncError::Transport("no snapshot scripted".into()))
            })
        }

        fn submit_guess(
            &self,
            request: SubmitGuessRequest,
        ) -> BoxFuture<'static, Result<GuessResponse, SubmitError>> {
            let result = self
                .submit_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(GuessResponse {
                        id: Uuid::new_v4(),
                        session_id: request.session_id.unwrap_or_default(),
                        name: request.name.clone(),
                        value: request.value,
                    })
                });
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn refresh_adopts_snapshot_and_recomputes_eliminations() {
        let source = ScriptedSource::new(vec![snapshot(20, false)]);
        let engine = SyncEngine::new(source);

        engine.refresh().await.unwrap();
        let view = engine.view().unwrap();

        // score 20 eliminates the 10 guess but not the 30 one
        assert!(view.players[0].eliminated);
        assert!(!view.players[1].eliminated);
        assert!(view.game_started); // target in the past, timer disarmed
    }

    #[tokio::test]
    async fn armed_future_timer_means_not_started() {
        let mut early = snapshot(0, false);
        early.game_timer = GameTimerSnapshot {
            target_date: "2099-01-01T18:00:00Z".into(),
            is_active: true,
        };
        let source = ScriptedSource::new(vec![early]);
        let engine = SyncEngine::new(source);

        engine.refresh().await.unwrap();
        assert!(!engine.view().unwrap().game_started);
    }

    #[tokio::test]
    async fn stale_receipt_never_replaces_newer_view() {
        let source = ScriptedSource::new(vec![]);
        let engine = SyncEngine::new(source);

        engine.adopt(snapshot(5, false), 2).unwrap();
        // An older receipt arriving late is discarded.
        engine.adopt(snapshot(99, false), 1).unwrap();

        assert_eq!(engine.view().unwrap().team_score, 5);

        // A newer receipt still wins.
        engine.adopt(snapshot(12, false), 3).unwrap();
        assert_eq!(engine.view().unwrap().team_score, 12);
    }

    #[tokio::test]
    async fn polling_stops_once_the_game_ends() {
        let source = ScriptedSource::new(vec![snapshot(10, false), snapshot(24, true)]);
        let engine = SyncEngine::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let handle = engine.start_polling(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(handle.is_finished());
        assert!(engine.game_ended());
        let fetches = source.fetch_count();
        // No further polls after the ended snapshot.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_polls_never_resume() {
        let source = ScriptedSource::new(vec![snapshot(10, false)]);
        let engine = SyncEngine::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let handle = engine.start_polling(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.stop();
        handle.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());

        let fetches = source.fetch_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_polling() {
        let source = ScriptedSource::new(vec![snapshot(10, false)]);
        let engine = SyncEngine::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let handle = engine.start_polling(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fetches = source.fetch_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn optimistic_submit_rolls_back_on_rejection() {
        let source = ScriptedSource::new(vec![snapshot(0, false)]);
        source.queue_submit(Err(SubmitError::DuplicateValue));
        let engine = SyncEngine::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);
        engine.refresh().await.unwrap();

        let before = engine.view().unwrap().players.len();
        let result = engine.submit_guess("Carol", 17).await;

        assert_eq!(result, Err(SubmitError::DuplicateValue));
        assert_eq!(engine.view().unwrap().players.len(), before);
    }

    #[tokio::test]
    async fn optimistic_submit_keeps_confirmed_entry() {
        let source = ScriptedSource::new(vec![snapshot(0, false)]);
        let engine = SyncEngine::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);
        engine.refresh().await.unwrap();

        engine.submit_guess("Carol", 17).await.unwrap();

        let view = engine.view().unwrap();
        let carol = view.players.iter().find(|p| p.name == "Carol").unwrap();
        assert!(carol.pending);
        assert_eq!(carol.score, 17);
    }
}
