//! Library crate for gameday-back, exposing modules for binaries, the polling
//! client and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod sync;
