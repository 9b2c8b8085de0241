pub mod admin;
pub mod auth;
pub mod error;
pub mod files;
pub mod messages;
pub mod middleware;
pub mod tickets;

use tracing::warn;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; fall back to the epoch on corrupt rows
/// rather than failing the whole response.
pub(crate) fn parse_db_time(raw: &str, context: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            chrono::DateTime::default()
        })
}

/// Row ids are written as UUID strings by this server; tolerate corrupt
/// rows the same way as timestamps.
pub(crate) fn parse_db_uuid(raw: &str, context: &str) -> uuid::Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        uuid::Uuid::default()
    })
}
