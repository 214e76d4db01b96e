//! Time related utils.

use crate::Error;
use chrono::Utc;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into http date: `Sun, 06 Nov 1994 08:49:37 GMT`
///
/// ## Note
///
/// HTTP date is slightly different from RFC2822.
///
/// - Timezone is fixed to GMT.
/// - Day must be 2 digit.
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse time from RFC3339.
///
/// All input will be converted into UTC.
pub fn parse_rfc3339(s: &str) -> crate::Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| Error::unexpected(format!("invalid rfc3339 time: {s}")).with_source(e))
}

/// Build a datetime from seconds since the unix epoch.
pub fn from_timestamp(secs: i64) -> crate::Result<DateTime> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::unexpected(format!("timestamp out of range: {secs}")))
}
