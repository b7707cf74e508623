use async_trait::async_trait;
use bookscout_core::Book;
use serde_json::Value;

pub mod catalog;
pub mod curated;
pub mod metadata;

pub use catalog::{CatalogClient, CatalogPage};
pub use curated::CuratedClient;
pub use metadata::{BookFacts, MetadataClient};

/// Uniform search/lookup capability over an external book source.
///
/// Implementations never fail: transport and parse errors are logged and
/// degrade to an empty list or `None`. Callers that need to distinguish
/// failure from emptiness use the concrete client's `Result` methods
/// instead; propagation is the aggregator's decision, not the adapter's.
#[async_trait]
pub trait BookProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Vec<Book>;

    async fn get_by_isbn(&self, isbn: &str) -> Option<Book>;
}

/// Non-empty string field. Absent keys and empty strings both count as
/// missing, so fallback chains skip past upstream empty values.
pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}
