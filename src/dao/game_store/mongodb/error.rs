use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB backend, one variant per operation family so
/// log lines identify what failed without backend internals leaking upward.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write session `{id}`")]
    WriteSession {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load session")]
    LoadSession {
        #[source]
        source: MongoError,
    },
    #[error("failed to write guess `{id}`")]
    WriteGuess {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load guess `{id}`")]
    LoadGuess {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load guesses for session `{session_id}`")]
    LoadGuesses {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to write score for session `{session_id}`")]
    WriteScore {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load score for session `{session_id}`")]
    LoadScore {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to write total players capacity")]
    WriteCapacity {
        #[source]
        source: MongoError,
    },
    #[error("failed to load total players capacity")]
    LoadCapacity {
        #[source]
        source: MongoError,
    },
    #[error("failed to write stats for participant `{participant}`")]
    WriteStats {
        participant: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load stats for participant `{participant}`")]
    LoadStats {
        participant: String,
        #[source]
        source: MongoError,
    },
}
