//! The aggregation pipeline.
//!
//! One aggregator, two search policies picked by configuration. The
//! single-source policy runs a paginated catalog search and enriches the
//! page. The merged policy fans out to the curated and catalog sources
//! concurrently, enriches the curated leg, drops catalog entries whose
//! ISBN the curated side already returned, and concatenates the rest. A
//! partial result beats no result: the merged call fails only when every
//! active source does.

use std::collections::HashSet;
use std::sync::Arc;

use bookscout_core::book::Book;
use bookscout_core::grouping::{self, GroupedBooks};
use bookscout_core::relevance;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{DiscoveryConfig, SearchPolicy};
use crate::enrichment::Enricher;
use crate::error::{DiscoveryError, Result};
use crate::sources::{BookProvider, CatalogClient, CuratedClient, MetadataClient};

/// Catalog page size for the merged policy, which is unpaginated.
const MERGED_CATALOG_LIMIT: u32 = 20;

/// One page of aggregated search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub books: Vec<Book>,
    /// Under the single-source policy this is the provider's total for the
    /// raw query, which junk filtering may undercut. Under the merged
    /// policy it is simply the merged count.
    pub total_items: u64,
}

// ─── BookAggregator ─────────────────────────────────────────

pub struct BookAggregator {
    catalog: Arc<CatalogClient>,
    curated: Arc<CuratedClient>,
    enricher: Enricher,
    providers: Vec<Arc<dyn BookProvider>>,
    config: DiscoveryConfig,
}

impl BookAggregator {
    pub fn new(config: DiscoveryConfig) -> Self {
        let catalog = CatalogClient::new(config.catalog_api_key.clone());
        let curated = CuratedClient::new(config.curated_api_key.clone());
        Self::from_parts(catalog, curated, MetadataClient::new(), config)
    }

    /// Aggregator configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(DiscoveryConfig::from_env())
    }

    fn from_parts(
        catalog: CatalogClient,
        curated: CuratedClient,
        metadata: MetadataClient,
        config: DiscoveryConfig,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let curated = Arc::new(curated);
        let enricher = Enricher::new(Arc::new(metadata));

        // Curated results lead wherever both sources appear; registering
        // that source first keeps fan-out output in the same order.
        let mut providers: Vec<Arc<dyn BookProvider>> = Vec::new();
        providers.push(curated.clone());
        if config.catalog_search_enabled {
            providers.push(catalog.clone());
        }

        Self {
            catalog,
            curated,
            enricher,
            providers,
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        config: DiscoveryConfig,
        catalog_url: String,
        curated_url: String,
        metadata_url: String,
    ) -> Self {
        Self::from_parts(
            CatalogClient::new_for_tests(catalog_url),
            CuratedClient::new_for_tests(curated_url),
            MetadataClient::new_for_tests(metadata_url),
            config,
        )
    }

    // ─── Search ─────────────────────────────────────────────

    /// Run the configured search policy. Pagination applies to the
    /// single-source policy; the merged policy is a one-shot union and
    /// ignores the cursor.
    pub async fn search(
        &self,
        query: &str,
        start_index: u32,
        page_size: u32,
    ) -> Result<SearchResults> {
        match self.config.search_policy {
            SearchPolicy::SingleSource => {
                self.search_catalog(query, start_index, page_size).await
            }
            SearchPolicy::MultiSource => self.search_merged(query).await,
        }
    }

    async fn search_catalog(
        &self,
        query: &str,
        start_index: u32,
        page_size: u32,
    ) -> Result<SearchResults> {
        let page = self
            .catalog
            .search_volumes(query, start_index, page_size)
            .await
            .map_err(|err| DiscoveryError::SearchUnavailable(err.to_string()))?;

        let books = self.enricher.enrich_all(page.books).await;
        Ok(SearchResults {
            books,
            total_items: page.total_items,
        })
    }

    async fn search_merged(&self, query: &str) -> Result<SearchResults> {
        let catalog_leg = async {
            if self.config.catalog_search_enabled {
                Some(
                    self.catalog
                        .search_volumes(query, 0, MERGED_CATALOG_LIMIT)
                        .await,
                )
            } else {
                None
            }
        };
        let (curated, catalog) = tokio::join!(self.curated.search_reviews(query), catalog_leg);

        let books = match (curated, catalog) {
            (Ok(curated), catalog) => {
                let curated = self.enricher.enrich_all(curated).await;
                match catalog {
                    Some(Ok(page)) => merge_unique(curated, page.books),
                    Some(Err(err)) => {
                        warn!("catalog source failed for {query:?}, keeping curated results: {err}");
                        curated
                    }
                    None => curated,
                }
            }
            (Err(err), Some(Ok(page))) => {
                warn!("curated source failed for {query:?}, keeping catalog results: {err}");
                page.books
            }
            (Err(curated_err), Some(Err(catalog_err))) => {
                warn!("curated source failed for {query:?}: {curated_err}");
                warn!("catalog source failed for {query:?}: {catalog_err}");
                return Err(DiscoveryError::AllSourcesFailed(query.to_string()));
            }
            (Err(err), None) => {
                warn!("curated source failed for {query:?}: {err}");
                return Err(DiscoveryError::AllSourcesFailed(query.to_string()));
            }
        };

        let total_items = books.len() as u64;
        Ok(SearchResults { books, total_items })
    }

    /// Fan out over every registered provider, merge, rank, and partition
    /// for display. Providers swallow their own failures, so the worst
    /// case is an empty grouping.
    pub async fn search_grouped(&self, query: &str) -> GroupedBooks {
        let fan_out = join_all(
            self.providers
                .iter()
                .map(|provider| provider.search(query)),
        )
        .await;
        for (provider, books) in self.providers.iter().zip(&fan_out) {
            debug!("{} returned {} result(s) for {query:?}", provider.name(), books.len());
        }

        let merged = dedup_by_isbn(fan_out.into_iter().flatten().collect());
        grouping::group(relevance::rank(merged, query))
    }

    // ─── Feeds ──────────────────────────────────────────────

    /// Current best-seller snapshot across lists, enriched.
    pub async fn trending(&self) -> Vec<Book> {
        match self.curated.overview().await {
            Ok(books) => self.enricher.enrich_all(books).await,
            Err(err) => {
                warn!("trending feed failed: {err}");
                Vec::new()
            }
        }
    }

    /// One named best-seller list, enriched.
    pub async fn curated_list(&self, list_name: &str) -> Vec<Book> {
        match self.curated.list(list_name).await {
            Ok(books) => self.enricher.enrich_all(books).await,
            Err(err) => {
                warn!("curated list {list_name:?} failed: {err}");
                Vec::new()
            }
        }
    }

    /// Well-known fiction, straight from the catalog.
    pub async fn popular(&self) -> Vec<Book> {
        match self.catalog.popular().await {
            Ok(books) => books,
            Err(err) => {
                warn!("popular feed failed: {err}");
                Vec::new()
            }
        }
    }

    /// Recently published fiction, straight from the catalog.
    pub async fn recent(&self) -> Vec<Book> {
        match self.catalog.recent().await {
            Ok(books) => books,
            Err(err) => {
                warn!("recent releases feed failed: {err}");
                Vec::new()
            }
        }
    }
}

// ─── Dedup ──────────────────────────────────────────────────

/// Merged-policy dedup: a catalog entry whose ISBN already appears among
/// the curated results is dropped. Entries without an ISBN always pass.
fn merge_unique(mut curated: Vec<Book>, catalog: Vec<Book>) -> Vec<Book> {
    let known: HashSet<String> = curated.iter().filter_map(|b| b.isbn.clone()).collect();
    curated.extend(catalog.into_iter().filter(|book| {
        book.isbn
            .as_ref()
            .map_or(true, |isbn| !known.contains(isbn))
    }));
    curated
}

/// Cross-provider dedup for the fan-out path: first occurrence of an ISBN
/// wins, books without one always pass.
fn dedup_by_isbn(books: Vec<Book>) -> Vec<Book> {
    let mut seen = HashSet::new();
    books
        .into_iter()
        .filter(|book| match &book.isbn {
            Some(isbn) => seen.insert(isbn.clone()),
            None => true,
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use bookscout_core::book::Source;
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use serde_json::{json, Value};

    use super::*;

    struct Harness {
        catalog: ServerGuard,
        curated: ServerGuard,
        metadata: ServerGuard,
        aggregator: BookAggregator,
    }

    async fn harness(config: DiscoveryConfig) -> Harness {
        let catalog = Server::new_async().await;
        let curated = Server::new_async().await;
        let metadata = Server::new_async().await;
        let aggregator =
            BookAggregator::for_tests(config, catalog.url(), curated.url(), metadata.url());
        Harness {
            catalog,
            curated,
            metadata,
            aggregator,
        }
    }

    fn single_source() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }

    fn multi_source(catalog_enabled: bool) -> DiscoveryConfig {
        DiscoveryConfig {
            catalog_search_enabled: catalog_enabled,
            search_policy: SearchPolicy::MultiSource,
            ..DiscoveryConfig::default()
        }
    }

    fn volumes_path(query: &str, start_index: u32) -> String {
        format!(
            "/volumes?q=intitle:{query}+OR+inauthor:{query}+OR+{query}&startIndex={start_index}&maxResults=40&orderBy=relevance&printType=books"
        )
    }

    fn volume(id: &str, title: &str, author: &str, isbn: Option<&str>) -> Value {
        let mut info = json!({"title": title, "authors": [author]});
        if let Some(isbn) = isbn {
            info["industryIdentifiers"] = json!([{"type": "ISBN_13", "identifier": isbn}]);
        }
        json!({"id": id, "volumeInfo": info})
    }

    fn review(title: &str, author: &str, isbn: &str) -> Value {
        json!({
            "book_title": title,
            "book_author": author,
            "isbn13": [isbn],
            "publication_dt": "2001-05-01",
            "summary": "A review.",
            "url": "https://example.org/review"
        })
    }

    /// Metadata source that knows nothing, so enrichment is a no-op.
    async fn metadata_noop(server: &mut ServerGuard) -> Mock {
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_single_source_search_enriches_and_keeps_total() {
        let mut h = harness(single_source()).await;
        let _volumes = h
            .catalog
            .mock("GET", volumes_path("dune", 0).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 77,
                    "items": [volume("vol-dune", "Dune", "Frank Herbert", Some("9780441013593"))]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _facts = h
            .metadata
            .mock("GET", "/?bibkeys=ISBN:9780441013593&jscmd=data&format=json")
            .with_status(200)
            .with_body(
                json!({"ISBN:9780441013593": {"publish_date": "1965", "number_of_pages": 412}})
                    .to_string(),
            )
            .create_async()
            .await;

        let results = h.aggregator.search("dune", 0, 12).await.unwrap();

        // Provider total survives junk filtering.
        assert_eq!(results.total_items, 77);
        assert_eq!(results.books.len(), 1);
        // The volume carried no publication date; the lookup filled it in.
        assert_eq!(results.books[0].published_year, "1965");
        assert_eq!(results.books[0].page_count, Some(412));
    }

    #[tokio::test]
    async fn test_single_source_failure_is_typed_and_not_retried() {
        let mut h = harness(single_source()).await;
        let volumes = h
            .catalog
            .mock("GET", Matcher::Regex(r"^/volumes.*".to_string()))
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let err = h.aggregator.search("dune", 0, 12).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::SearchUnavailable(_)));
        volumes.assert_async().await;
    }

    #[tokio::test]
    async fn test_merged_dedups_catalog_against_curated() {
        let mut h = harness(multi_source(true)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=dune")
            .with_status(200)
            .with_body(
                json!({"results": [review("Dune", "Frank Herbert", "9780441013593")]})
                    .to_string(),
            )
            .create_async()
            .await;
        let _volumes = h
            .catalog
            .mock("GET", volumes_path("dune", 0).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 2,
                    "items": [
                        volume("vol-dune", "Dune", "Frank Herbert", Some("9780441013593")),
                        volume("vol-messiah", "Dune Messiah", "Frank Herbert", None)
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _facts = metadata_noop(&mut h.metadata).await;

        let results = h.aggregator.search("dune", 0, 12).await.unwrap();

        // The shared ISBN appears once, from the curated side; the catalog
        // entry without an ISBN survives.
        assert_eq!(results.books.len(), 2);
        assert_eq!(results.books[0].source, Source::Curated);
        assert_eq!(results.books[0].isbn.as_deref(), Some("9780441013593"));
        assert_eq!(results.books[1].id, "vol-messiah");
        assert_eq!(results.total_items, 2);
    }

    #[tokio::test]
    async fn test_merged_catalog_failure_degrades_to_curated_only() {
        let mut h = harness(multi_source(true)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=dune")
            .with_status(200)
            .with_body(
                json!({"results": [review("Dune", "Frank Herbert", "9780441013593")]})
                    .to_string(),
            )
            .create_async()
            .await;
        let _volumes = h
            .catalog
            .mock("GET", Matcher::Regex(r"^/volumes.*".to_string()))
            .with_status(500)
            .create_async()
            .await;
        let _facts = metadata_noop(&mut h.metadata).await;

        let results = h.aggregator.search("dune", 0, 12).await.unwrap();

        assert_eq!(results.books.len(), 1);
        assert_eq!(results.books[0].source, Source::Curated);
    }

    #[tokio::test]
    async fn test_merged_curated_failure_keeps_catalog_leg() {
        let mut h = harness(multi_source(true)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=dune")
            .with_status(500)
            .create_async()
            .await;
        let _volumes = h
            .catalog
            .mock("GET", volumes_path("dune", 0).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 1,
                    "items": [volume("vol-dune", "Dune", "Frank Herbert", Some("9780441013593"))]
                })
                .to_string(),
            )
            .create_async()
            .await;
        // The catalog fallback is served as-is, no enrichment pass.
        let facts = h
            .metadata
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let results = h.aggregator.search("dune", 0, 12).await.unwrap();

        assert_eq!(results.books.len(), 1);
        assert_eq!(results.books[0].source, Source::Catalog);
        facts.assert_async().await;
    }

    #[tokio::test]
    async fn test_merged_fails_only_when_both_legs_fail() {
        let mut h = harness(multi_source(true)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=dune")
            .with_status(500)
            .create_async()
            .await;
        let _volumes = h
            .catalog
            .mock("GET", Matcher::Regex(r"^/volumes.*".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let err = h.aggregator.search("dune", 0, 12).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::AllSourcesFailed(_)));
    }

    #[tokio::test]
    async fn test_merged_toggle_off_skips_catalog() {
        let mut h = harness(multi_source(false)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=dune")
            .with_status(200)
            .with_body(
                json!({"results": [review("Dune", "Frank Herbert", "9780441013593")]})
                    .to_string(),
            )
            .create_async()
            .await;
        let volumes = h
            .catalog
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let _facts = metadata_noop(&mut h.metadata).await;

        let results = h.aggregator.search("dune", 0, 12).await.unwrap();

        assert_eq!(results.books.len(), 1);
        volumes.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_source_pagination_appends_cleanly() {
        let mut h = harness(single_source()).await;
        let _first_page = h
            .catalog
            .mock("GET", volumes_path("dune", 0).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 4,
                    "items": [
                        volume("vol-a", "Dune One", "A", None),
                        volume("vol-b", "Dune Two", "A", None)
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _second_page = h
            .catalog
            .mock("GET", volumes_path("dune", 2).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 4,
                    "items": [
                        volume("vol-c", "Dune Three", "A", None),
                        volume("vol-d", "Dune Four", "A", None)
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let first = h.aggregator.search("dune", 0, 2).await.unwrap();
        let second = h.aggregator.search("dune", 2, 2).await.unwrap();

        let mut ids: Vec<String> = first
            .books
            .iter()
            .chain(second.books.iter())
            .map(|b| b.id.clone())
            .collect();
        assert_eq!(ids.len(), 4);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_grouped_search_surfaces_exact_match() {
        let mut h = harness(multi_source(true)).await;
        let _reviews = h
            .curated
            .mock("GET", "/reviews.json?title=Dune")
            .with_status(200)
            .with_body(json!({"results": []}).to_string())
            .create_async()
            .await;
        let _volumes = h
            .catalog
            .mock("GET", volumes_path("Dune", 0).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "totalItems": 3,
                    "items": [
                        volume("vol-encyclopedia", "The Dune Encyclopedia", "Willis E. McNelly", None),
                        volume("vol-dune", "Dune", "Frank Herbert", Some("9780441013593")),
                        volume("vol-sand", "Sandworms of Arrakis", "Someone Else", None)
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let grouped = h.aggregator.search_grouped("Dune").await;

        let top = grouped.top_match.unwrap();
        assert_eq!(top.title, "Dune");
        assert_eq!(top.relevance_score, Some(100));
        // Substring match lands in related, the no-signal title in others.
        assert_eq!(grouped.related.len(), 1);
        assert_eq!(grouped.related[0].id, "vol-encyclopedia");
        assert_eq!(grouped.others.len(), 1);
        assert_eq!(grouped.others[0].id, "vol-sand");
    }

    #[tokio::test]
    async fn test_trending_enriches_overview() {
        let mut h = harness(multi_source(true)).await;
        let _overview = h
            .curated
            .mock("GET", "/lists/overview.json")
            .with_status(200)
            .with_body(
                json!({"results": {"lists": [{"books": [{
                    "title": "Dune",
                    "author": "Frank Herbert",
                    "primary_isbn13": "9780441013593"
                }]}]}})
                .to_string(),
            )
            .create_async()
            .await;
        let _facts = h
            .metadata
            .mock("GET", "/?bibkeys=ISBN:9780441013593&jscmd=data&format=json")
            .with_status(200)
            .with_body(json!({"ISBN:9780441013593": {"publish_date": "1965"}}).to_string())
            .create_async()
            .await;

        let books = h.aggregator.trending().await;

        assert_eq!(books.len(), 1);
        // List entries never carry a year themselves.
        assert_eq!(books[0].published_year, "1965");
    }

    #[tokio::test]
    async fn test_trending_swallows_overview_failure() {
        let mut h = harness(multi_source(true)).await;
        let _overview = h
            .curated
            .mock("GET", "/lists/overview.json")
            .with_status(500)
            .create_async()
            .await;

        assert!(h.aggregator.trending().await.is_empty());
    }

    #[tokio::test]
    async fn test_curated_list_is_enriched() {
        let mut h = harness(multi_source(true)).await;
        let _list = h
            .curated
            .mock("GET", "/lists/current/hardcover-fiction.json")
            .with_status(200)
            .with_body(
                json!({"results": {"books": [{
                    "title": "Dune",
                    "author": "Frank Herbert",
                    "primary_isbn13": "9780441013593",
                    "rank": 1
                }]}})
                .to_string(),
            )
            .create_async()
            .await;
        let _facts = h
            .metadata
            .mock("GET", "/?bibkeys=ISBN:9780441013593&jscmd=data&format=json")
            .with_status(200)
            .with_body(
                json!({"ISBN:9780441013593": {"publishers": [{"name": "Ace"}]}}).to_string(),
            )
            .create_async()
            .await;

        let books = h.aggregator.curated_list("hardcover-fiction").await;

        assert_eq!(books.len(), 1);
        assert_eq!(books[0].rank, Some(1));
        assert_eq!(books[0].publisher.as_deref(), Some("Ace"));
    }

    #[tokio::test]
    async fn test_discovery_feeds_swallow_failures() {
        let mut h = harness(single_source()).await;
        let volumes = h
            .catalog
            .mock("GET", Matcher::Any)
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        assert!(h.aggregator.popular().await.is_empty());
        assert!(h.aggregator.recent().await.is_empty());
        // One attempt per feed, no retries.
        volumes.assert_async().await;
    }

    #[test]
    fn test_merge_unique_keeps_curated_and_unknown_isbns() {
        let mut curated_book = Book::new("c1", "Dune", Source::Curated);
        curated_book.isbn = Some("9780441013593".to_string());

        let mut catalog_dupe = Book::new("g1", "Dune", Source::Catalog);
        catalog_dupe.isbn = Some("9780441013593".to_string());
        let mut catalog_other = Book::new("g2", "Dune Messiah", Source::Catalog);
        catalog_other.isbn = Some("9780441104024".to_string());
        let catalog_anon = Book::new("g3", "Children of Dune", Source::Catalog);

        let merged = merge_unique(
            vec![curated_book],
            vec![catalog_dupe, catalog_other, catalog_anon],
        );

        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "g2", "g3"]);
    }

    #[test]
    fn test_dedup_by_isbn_first_wins() {
        let mut a = Book::new("a", "Dune", Source::Curated);
        a.isbn = Some("9780441013593".to_string());
        let mut b = Book::new("b", "Dune", Source::Catalog);
        b.isbn = Some("9780441013593".to_string());
        let c = Book::new("c", "Dune", Source::Catalog);

        let kept = dedup_by_isbn(vec![a, b, c]);
        let ids: Vec<&str> = kept.iter().map(|book| book.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
