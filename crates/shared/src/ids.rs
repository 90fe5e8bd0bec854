//! Identifier generation for stored entities.
//!
//! Identifiers are short, prefixed strings so a bare id in a log line tells
//! which collection it belongs to: `m` members, `c` closet garments, `h`
//! search history records, `p-` places.

use chrono::Utc;
use uuid::Uuid;

pub const MEMBER_PREFIX: &str = "m";
pub const GARMENT_PREFIX: &str = "c";
pub const SEARCH_RECORD_PREFIX: &str = "h";

/// Generates a prefixed id: `<prefix><unix millis>-<8 hex chars>`.
///
/// The millisecond component keeps ids roughly sortable by creation time;
/// the random suffix keeps two uploads in the same millisecond apart.
pub fn prefixed_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}-{}", prefix, Utc::now().timestamp_millis(), &suffix[..8])
}

pub fn member_id() -> String {
    prefixed_id(MEMBER_PREFIX)
}

pub fn garment_id() -> String {
    prefixed_id(GARMENT_PREFIX)
}

pub fn search_record_id() -> String {
    prefixed_id(SEARCH_RECORD_PREFIX)
}

/// Place ids are scoped to one search response: `p-<index>-<unix millis>`.
pub fn place_id(index: usize, timestamp_millis: i64) -> String {
    format!("p-{}-{}", index, timestamp_millis)
}
