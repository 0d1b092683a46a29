use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Timestamp reported for entries the backend returns without metadata.
pub fn unknown() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn format_listing_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}
