//! Process-wide schema cache.
//!
//! Schemas are immutable for a given id, so the cache only ever grows:
//! insert-if-absent, no eviction, no refresh. Duplicate in-flight fetches
//! for the same id are allowed; whichever lands first wins and the values
//! are identical anyway.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::ResolvedSchema;

#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<u32, Arc<ResolvedSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: u32) -> Option<Arc<ResolvedSchema>> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Insert a resolved schema unless the id is already present, returning
    /// the cached entry either way.
    pub async fn insert(&self, schema: Arc<ResolvedSchema>) -> Arc<ResolvedSchema> {
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(schema.id).or_insert(schema))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(id: u32, name: &str) -> Arc<ResolvedSchema> {
        let definition = format!(
            r#"{{"type":"record","name":"{name}","fields":[{{"name":"a","type":"string"}}]}}"#
        );
        Arc::new(ResolvedSchema::parse(id, &definition).unwrap())
    }

    #[tokio::test]
    async fn test_get_miss_returns_none() {
        let cache = SchemaCache::new();
        assert!(cache.get(7).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = SchemaCache::new();
        cache.insert(resolved(7, "first")).await;
        let cached = cache.get(7).await.unwrap();
        assert_eq!(cached.id, 7);
        assert_eq!(cached.name.as_deref(), Some("first"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_is_first_writer_wins() {
        let cache = SchemaCache::new();
        cache.insert(resolved(7, "first")).await;
        let winner = cache.insert(resolved(7, "second")).await;
        assert_eq!(winner.name.as_deref(), Some("first"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_accumulate() {
        let cache = SchemaCache::new();
        cache.insert(resolved(1, "one")).await;
        cache.insert(resolved(2, "two")).await;
        assert_eq!(cache.len().await, 2);
    }
}
