//! Logical collections and the store contract every repository follows.

use serde::Serialize;

/// The three logical collections the studio persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Collection {
    #[serde(rename = "squad")]
    Squad,
    #[serde(rename = "closet")]
    Closet,
    #[serde(rename = "searchHistory")]
    SearchHistory,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Squad,
        Collection::Closet,
        Collection::SearchHistory,
    ];

    /// Stable collection name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Squad => "squad",
            Collection::Closet => "closet",
            Collection::SearchHistory => "searchHistory",
        }
    }

    /// Backing table.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Squad => "squad",
            Collection::Closet => "closet",
            Collection::SearchHistory => "search_history",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value contract over one collection.
///
/// `save` upserts by id, `remove` is a no-op for unknown ids and `list_all`
/// makes no ordering promise. No operation spans collections.
#[async_trait::async_trait]
pub trait CollectionStore<T>: Send + Sync {
    fn collection(&self) -> Collection;

    async fn save(&self, item: &T) -> Result<(), sqlx::Error>;

    /// Returns the number of rows removed (0 or 1).
    async fn remove(&self, id: &str) -> Result<u64, sqlx::Error>;

    async fn list_all(&self) -> Result<Vec<T>, sqlx::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Squad.as_str(), "squad");
        assert_eq!(Collection::SearchHistory.to_string(), "searchHistory");
        assert_eq!(Collection::SearchHistory.table(), "search_history");
    }

    #[test]
    fn test_collection_serializes_to_name() {
        for collection in Collection::ALL {
            let json = serde_json::to_string(&collection).unwrap();
            assert_eq!(json, format!("\"{}\"", collection.as_str()));
        }
    }
}
