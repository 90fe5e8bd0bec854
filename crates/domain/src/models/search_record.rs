//! Persisted place-search history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::place::Place;

/// One past search with the places it returned, so the history dropdown can
/// replay results without querying the service again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<Place>,
}

impl SearchRecord {
    pub fn new(query: impl Into<String>, results: Vec<Place>) -> Self {
        Self {
            id: shared::ids::search_record_id(),
            query: query.into(),
            timestamp: Utc::now(),
            results,
        }
    }
}
