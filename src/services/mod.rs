// Service exports
pub mod appwrite;
pub mod cache;
pub mod oracle;
pub mod postgres;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use oracle::{CachedOracle, HttpRankingOracle};
pub use postgres::{PostgresClient, StatusColumn};
