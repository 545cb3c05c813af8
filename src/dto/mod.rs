//! Request and response types shared by the REST surface and the client.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod game;
pub mod health;
pub mod validation;

/// Format a timestamp for the wire; snapshots always carry RFC 3339 strings.
pub fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
