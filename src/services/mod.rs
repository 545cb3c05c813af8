//! Business logic shared by the REST routes.

pub mod documentation;
pub mod guess_service;
pub mod health_service;
pub mod score_service;
pub mod session_service;
pub mod snapshot_service;
pub mod storage_supervisor;
