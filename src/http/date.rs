//! HTTP date handling for `Last-Modified` / `If-Modified-Since`

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a file timestamp as an HTTP date
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(IMF_FIXDATE).to_string()
}

/// Parse an HTTP date header value into seconds since the Unix epoch.
///
/// Unparseable values yield `None`, and the header is then ignored.
pub fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

/// Whole seconds since the epoch, the precision HTTP dates carry
pub fn unix_seconds(time: SystemTime) -> Option<i64> {
    let secs = time.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}

/// True when a resource modified at `modified` is not newer than the
/// client's `If-Modified-Since` value
pub fn not_modified_since(modified: SystemTime, if_modified_since: &str) -> bool {
    match (unix_seconds(modified), parse_http_date(if_modified_since)) {
        (Some(mtime), Some(since)) => mtime <= since,
        _ => false,
    }
}
