use time::OffsetDateTime;

/// Current instant in UTC.
///
/// Every timestamp the coordinator records goes through here; fields
/// serialize as RFC 3339 via `time::serde::rfc3339` at the struct level.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
