//! MongoDB backend for the [`GameStore`](super::GameStore) trait.
//!
//! Guess uniqueness (one value per session, one guess per participant) is
//! enforced by unique compound indexes, so concurrent submissions race at the
//! database and exactly one wins.

mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::{MongoDaoError, MongoResult};
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(value: MongoDaoError) -> Self {
        StorageError::unavailable(value.to_string(), value)
    }
}
