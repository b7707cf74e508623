//! Multi-source book discovery: concurrent search across a catalog and a
//! curated editorial source, ISBN-keyed metadata enrichment, cross-source
//! deduplication and relevance ranking.
//!
//! [`BookAggregator`] is the front door. It is stateless between calls;
//! every operation is one request/response cycle over the upstream APIs.

pub mod aggregator;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod sources;

pub use aggregator::{BookAggregator, SearchResults};
pub use config::{DiscoveryConfig, SearchPolicy};
pub use enrichment::Enricher;
pub use error::{DiscoveryError, Result};
pub use sources::BookProvider;
