//! Memory module: embedding generation, caching, and the online-memory
//! adapter.
//!
//! - `embedding`: HTTP embedding client, used by skill selection (§4.9)
//! - `cache`: in-process embedding cache (moka)
//! - `online`: optional remote recall/store service (§4.15)

pub mod cache;
pub mod embedding;
pub mod online;

pub use cache::MemoryCache;
pub use embedding::EmbeddingService;
pub use online::{OnlineMemoryAdapter, RecalledMemory};
