//! In-process embedding cache.
//!
//! Uses moka async cache (Send + Sync, TTL-based eviction). Avoids paying
//! the embedding service's latency/cost twice for the same query text
//! within a skill-selection pass (§4.9).

use moka::future::Cache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

fn hash_key(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// In-process embedding cache.
#[derive(Clone)]
pub struct MemoryCache {
    embeddings: Cache<u64, Vec<f32>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache {
            embeddings: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(30 * 60))
                .build(),
        }
    }

    pub async fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings.get(&hash_key(text)).await
    }

    pub async fn put_embedding(&self, text: &str, embedding: Vec<f32>) {
        self.embeddings.insert(hash_key(text), embedding).await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_cache_round_trips() {
        let cache = MemoryCache::new();

        assert!(cache.get_embedding("hello").await.is_none());

        cache.put_embedding("hello", vec![0.1, 0.2, 0.3]).await;

        let result = cache.get_embedding("hello").await;
        assert!(result.is_some());
        assert_eq!(result.unwrap().len(), 3);
    }
}
