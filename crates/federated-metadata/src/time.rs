//! Time utilities.
//!
//! JWT timestamps (`iat`, `exp`) are whole seconds since the Unix epoch.

/// Return the current time as seconds since Unix epoch.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Convert epoch seconds to an RFC 3339 string.
pub fn secs_to_rfc3339(secs: i64) -> String {
    let dt = chrono::DateTime::from_timestamp(secs, 0).unwrap_or(chrono::DateTime::UNIX_EPOCH);
    dt.to_rfc3339()
}
