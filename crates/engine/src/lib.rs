//! # Fathom Engine
//!
//! The Fathom Engine orchestrates named queries against named data providers.
//! Queries are bound and prepared when added, executed together the first time
//! any result is requested, and decoded through the provider they are bound to.
//!
//! ## Key Features
//!
//! - **Lazy batched execution**: every pending query runs in one concurrent batch
//! - **Sub-requests**: optional queries whose failures never abort their siblings
//! - **Response caching**: pluggable [`CacheStore`] with lifetimes and tags
//! - **Pluggable query kinds**: build strategies resolved by [`fathom_types::QueryKind`]
//!
//! ## Usage
//!
//! ```ignore
//! use fathom_engine::{HttpProvider, QueryManager};
//! use fathom_types::Query;
//!
//! let mut manager = QueryManager::new();
//! manager.add_data_provider("blog", HttpProvider::new("https://api.example.com")?)?;
//! manager.add(Query::rest("/posts").named("posts").with_root_path("data"), None)?;
//!
//! let posts = manager.get_collection("posts", None).await?;
//! println!("{} posts, hit: {:?}", posts.len(), manager.is_hit("posts")?);
//! ```
//!
//! ## Architecture
//!
//! - **`provider`**: the [`DataProvider`] contract plus HTTP and GraphQL providers
//! - **`strategy`**: per-kind request construction and the [`StrategyRegistry`]
//! - **`stack`**: the ordered [`QueryStack`] of bound queries and their responses
//! - **`manager`**: the [`QueryManager`] that ties the pieces together
//! - **`cache`**: the [`CacheStore`] abstraction and an in-memory backend

pub mod cache;
pub mod error;
pub mod manager;
pub mod provider;
pub mod request;
pub mod response;
pub mod stack;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use cache::{CacheError, CacheItem, CacheSettings, CacheStore, MemoryCache};
pub use error::{QueryError, TransportError};
pub use manager::{DEFAULT_CONCURRENCY, QueryManager};
pub use provider::{DataProvider, GraphQlProvider, HttpProvider, run_cached};
pub use request::PreparedRequest;
pub use response::{CacheableResponse, RawResponse};
pub use stack::{EntryState, QueryStack, StackEntry};
pub use strategy::{BuildQueryStrategy, GraphQlStrategy, RestStrategy, StrategyRegistry};
