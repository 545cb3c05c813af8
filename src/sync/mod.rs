//! Pull-based client for the snapshot protocol.
//!
//! The engine keeps a local [`GameView`](engine::GameView) that is replaced
//! wholesale with every snapshot received, guarded by a receipt sequence so a
//! late response never overwrites a newer one. Polling runs on a fixed
//! interval, never overlaps itself and stops exactly once when the game ends
//! or the handle is dropped.

pub mod engine;
#[cfg(feature = "http-client")]
pub mod http;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dto::game::{GuessResponse, SnapshotResponse, SubmitGuessRequest};

/// Errors fetching or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a usable response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The response arrived but could not be interpreted.
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
}

/// Errors surfaced by an optimistic guess submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Another guess already claimed this value.
    #[error("a guess with this value already exists")]
    DuplicateValue,
    /// This participant already has a guess in the session.
    #[error("participant already has a guess")]
    DuplicateParticipant,
    /// The server rejected the payload outright.
    #[error("invalid submission: {0}")]
    InvalidInput(String),
    /// The request never reached a decision.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Where snapshots come from. The engine is written against this seam so
/// tests can drive it with scripted responses.
pub trait SnapshotSource: Send + Sync {
    /// Fetch one consolidated snapshot.
    fn fetch_snapshot(&self) -> BoxFuture<'static, Result<SnapshotResponse, SyncError>>;

    /// Submit a guess on behalf of the participant.
    fn submit_guess(
        &self,
        request: SubmitGuessRequest,
    ) -> BoxFuture<'static, Result<GuessResponse, SubmitError>>;
}
