//! Data access layer: storage-agnostic entities, the [`GameStore`] trait and
//! its backends.
//!
//! [`GameStore`]: game_store::GameStore

pub mod game_store;
pub mod models;
pub mod storage;
