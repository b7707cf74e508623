use std::collections::HashSet;

use async_trait::async_trait;
use bookscout_core::book::{
    Book, BuyLink, Source, DEFAULT_DESCRIPTION, DEFAULT_REVIEW_SUMMARY, UNKNOWN_AUTHOR,
    YEAR_UNKNOWN,
};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::http::ApiClient;
use crate::sources::{text_field, BookProvider};

const BASE_URL: &str = "https://api.nytimes.com/svc/books/v3";

/// How many unique titles the trending overview keeps.
const TRENDING_LIMIT: usize = 8;

// ─── CuratedClient ──────────────────────────────────────────

/// Client for the editorial best-seller/review source (NYT Books API).
pub struct CuratedClient {
    http: ApiClient,
    api_key: Option<String>,
    base_url: String,
}

impl CuratedClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(BASE_URL.to_string(), api_key)
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: ApiClient::new(),
            api_key,
            base_url,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(base_url: String) -> Self {
        Self::with_base_url(base_url, None)
    }

    /// Overview of every best-seller list: entries flattened in list order,
    /// duplicate ids dropped (first occurrence wins), capped at
    /// [`TRENDING_LIMIT`].
    pub async fn overview(&self) -> Result<Vec<Book>> {
        let url = self.endpoint("/lists/overview.json".to_string());
        let json = self.http.get_json(&url).await?;

        let mut books = Vec::new();
        let mut seen = HashSet::new();
        let lists = json
            .get("results")
            .and_then(|r| r.get("lists"))
            .and_then(Value::as_array);
        if let Some(lists) = lists {
            for list in lists {
                let Some(entries) = list.get("books").and_then(Value::as_array) else {
                    continue;
                };
                for entry in entries {
                    let book = book_from_list_entry(entry);
                    if seen.insert(book.id.clone()) {
                        books.push(book);
                    }
                }
            }
        }

        books.truncate(TRENDING_LIMIT);
        Ok(books)
    }

    /// One named best-seller list (`hardcover-fiction` and friends).
    pub async fn list(&self, list_name: &str) -> Result<Vec<Book>> {
        let url = self.endpoint(format!(
            "/lists/current/{}.json",
            urlencoding::encode(list_name)
        ));
        let json = self.http.get_json(&url).await?;

        Ok(json
            .get("results")
            .and_then(|r| r.get("books"))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(book_from_list_entry).collect())
            .unwrap_or_default())
    }

    /// Review search by title. The closest thing this source has to a
    /// general search endpoint.
    pub async fn search_reviews(&self, query: &str) -> Result<Vec<Book>> {
        let url = self.endpoint(format!("/reviews.json?title={}", urlencoding::encode(query)));
        let json = self.http.get_json(&url).await?;

        Ok(json
            .get("results")
            .and_then(Value::as_array)
            .map(|reviews| reviews.iter().map(book_from_review).collect())
            .unwrap_or_default())
    }

    fn endpoint(&self, path: String) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if let Some(key) = &self.api_key {
            url.push(if path.contains('?') { '&' } else { '?' });
            url.push_str("api-key=");
            url.push_str(key);
        }
        url
    }
}

#[async_trait]
impl BookProvider for CuratedClient {
    fn name(&self) -> &'static str {
        "curated"
    }

    async fn search(&self, query: &str) -> Vec<Book> {
        match self.search_reviews(query).await {
            Ok(books) => books,
            Err(err) => {
                warn!("curated review search failed for {query:?}: {err}");
                Vec::new()
            }
        }
    }

    /// No direct ISBN endpoint here; the review search accepts ISBN strings,
    /// so reuse it and take the first hit.
    async fn get_by_isbn(&self, isbn: &str) -> Option<Book> {
        match self.search_reviews(isbn).await {
            Ok(books) => books.into_iter().next(),
            Err(err) => {
                warn!("curated ISBN lookup failed for {isbn}: {err}");
                None
            }
        }
    }
}

// ─── Normalization ──────────────────────────────────────────

fn book_from_list_entry(entry: &Value) -> Book {
    let isbn = text_field(entry, "primary_isbn13").or_else(|| text_field(entry, "primary_isbn10"));
    // The primary ISBN doubles as the id; title as a last resort.
    let id = isbn
        .clone()
        .or_else(|| text_field(entry, "title"))
        .unwrap_or_default();
    let title = text_field(entry, "title").unwrap_or_default();

    let mut book = Book::new(id, title, Source::Curated);

    // A single author string upstream, wrapped into our list shape.
    book.authors = text_field(entry, "author")
        .map(|a| vec![a])
        .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]);
    book.description =
        text_field(entry, "description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
    book.image = text_field(entry, "book_image").unwrap_or_default();
    // List entries carry list dates, not publication dates; enrichment may
    // fill the year in later.
    book.published_year = YEAR_UNKNOWN.to_string();
    book.preview_link = text_field(entry, "book_review_link")
        .or_else(|| text_field(entry, "sunday_review_link"))
        .unwrap_or_default();
    book.isbn = isbn;
    book.publisher = text_field(entry, "publisher");

    book.rank = uint_field(entry, "rank");
    book.rank_last_week = uint_field(entry, "rank_last_week");
    book.weeks_on_list = uint_field(entry, "weeks_on_list");
    book.amazon_url = text_field(entry, "amazon_product_url");
    book.buy_links = entry
        .get("buy_links")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| {
                    Some(BuyLink {
                        name: text_field(link, "name")?,
                        url: text_field(link, "url")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    book
}

fn book_from_review(review: &Value) -> Book {
    let isbn = review
        .get("isbn13")
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned);
    let id = isbn
        .clone()
        .or_else(|| text_field(review, "book_title"))
        .unwrap_or_default();
    let title = text_field(review, "book_title").unwrap_or_default();

    let mut book = Book::new(id, title, Source::Curated);

    book.authors = text_field(review, "book_author")
        .map(|a| vec![a])
        .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]);
    book.description = text_field(review, "summary")
        .unwrap_or_else(|| DEFAULT_REVIEW_SUMMARY.to_string());
    // Reviews carry no cover; enrichment fills it in.
    book.published_year = text_field(review, "publication_dt")
        .map(|date| date.split('-').next().unwrap_or_default().to_string())
        .unwrap_or_else(|| YEAR_UNKNOWN.to_string());
    book.preview_link = text_field(review, "url").unwrap_or_default();
    book.isbn = isbn;

    book
}

fn uint_field(value: &Value, key: &str) -> Option<u32> {
    value.get(key).and_then(Value::as_u64).map(|n| n as u32)
}

// ─── Tests ──────────────────────────────────────────────────
