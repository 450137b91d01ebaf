//! # fedtrust Trust-Chain Resolver
//!
//! Resolution of OpenID-Federation trust chains: given a starting entity
//! and a set of trust anchors, discover every valid chain of signed entity
//! statements linking the two, verify the signatures along each chain, and
//! filter the survivors by metadata-policy validity.
//!
//! # Architecture
//!
//! ```text
//! TrustResolver::resolve_to_valid_chains
//!   │
//!   ├─ resolve            build the trust tree from authority hints
//!   │    └─ StatementFetcher      cache → obtainer, grace-period refresh
//!   │         ├─ StatementCache   per-statement TTL (moka)
//!   │         └─ StatementObtainer  HTTP / in-memory
//!   ├─ verify_signatures  post-order key propagation, prune in place
//!   └─ chains + filter    flatten, prepend leaf, drop policy conflicts
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fedtrust_resolver::{TrustAnchor, TrustResolver};
//!
//! # async fn example() {
//! let mut resolver = TrustResolver::new(
//!     vec![TrustAnchor::new("https://ta.example.org")],
//!     "https://op.example.org",
//! );
//! let chains = resolver.resolve_to_valid_chains().await;
//! for chain in &chains {
//!     println!("chain of {} statements", chain.len());
//! }
//! # }
//! ```

#![deny(unsafe_code)]

/// Entity-statement cache.
pub mod cache;
/// Trust chains and chain filtering.
pub mod chain;
/// Resolver error types.
pub mod error;
/// Cached statement fetching with grace-period refresh.
pub mod fetcher;
/// Statement obtainers (HTTP and in-memory).
pub mod obtainer;
/// Resolve response serialisation.
pub mod response;
/// The resolver façade.
pub mod resolver;
/// Trust tree internals.
mod tree;

// Re-export primary types at crate root for convenience
pub use cache::{DEFAULT_CACHE_CAPACITY, StatementCache, cache_key};
pub use chain::{TrustChain, TrustChains};
pub use error::{BoxError, ResolverError, ResolverResult};
pub use fetcher::{DEFAULT_GRACE_PERIOD, StatementFetcher, default_fetcher};
pub use obtainer::{
    DEFAULT_HTTP_TIMEOUT, HttpObtainer, MemoryObtainer, StatementObtainer,
    WELL_KNOWN_FEDERATION_PATH,
};
pub use response::ResolveResponse;
pub use resolver::{TrustAnchor, TrustResolver};
pub use tree::MAX_RESOLVE_DEPTH;
