use async_trait::async_trait;
use bookscout_core::book::{
    Book, Source, DEFAULT_DESCRIPTION, DEFAULT_PREVIEW_LINK, DEFAULT_TITLE, UNKNOWN_AUTHOR,
    YEAR_UNKNOWN,
};
use bookscout_core::{filter, relevance};
use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::http::ApiClient;
use crate::sources::{text_field, BookProvider};

const BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Candidate pool per search call. Deliberately larger than any page size so
/// client-side junk filtering still leaves a full page; 40 is the volumes
/// API maximum.
const CANDIDATE_POOL: u32 = 40;
/// Pool when searching through the capability trait (unpaginated).
const PROVIDER_RESULT_LIMIT: u32 = 20;
/// Length of the popular/recent discovery feeds.
const FEED_LIMIT: usize = 6;
/// How many newest volumes to scan before the publication-year cut.
const RECENT_SCAN_LIMIT: u32 = 20;
const RECENT_WINDOW_YEARS: i32 = 3;

/// One page of catalog search results.
///
/// `total_items` is the provider's count for the unfiltered query; junk
/// filtering can leave fewer books than it claims. Accepted, not corrected.
#[derive(Debug)]
pub struct CatalogPage {
    pub books: Vec<Book>,
    pub total_items: u64,
}

// ─── CatalogClient ──────────────────────────────────────────

/// Client for the broad volume-search source (Google Books volumes API).
pub struct CatalogClient {
    http: ApiClient,
    api_key: Option<String>,
    base_url: String,
}

impl CatalogClient {
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

    /// Paginated volume search.
    ///
    /// Issues the structured query `intitle:{q}+OR+inauthor:{q}+OR+{q}`
    /// ordered by relevance and restricted to print books, pulls a
    /// [`CANDIDATE_POOL`]-sized pool from `start_index`, junk-filters,
    /// scores, stable-sorts and trims to `page_size`. Blank queries
    /// short-circuit to an empty page without a request.
    pub async fn search_volumes(
        &self,
        query: &str,
        start_index: u32,
        page_size: u32,
    ) -> Result<CatalogPage> {
        if query.trim().is_empty() {
            return Ok(CatalogPage {
                books: Vec::new(),
                total_items: 0,
            });
        }

        let encoded = urlencoding::encode(query);
        let structured = format!("intitle:{encoded}+OR+inauthor:{encoded}+OR+{encoded}");
        let mut url = format!(
            "{}/volumes?q={structured}&startIndex={start_index}&maxResults={CANDIDATE_POOL}&orderBy=relevance&printType=books",
            self.base_url
        );
        self.append_key(&mut url);

        let json = self.http.get_json(&url).await?;
        let total_items = json.get("totalItems").and_then(Value::as_u64).unwrap_or(0);

        let books = filter::filter_junk(parse_volumes(&json));
        let mut books = relevance::rank(books, query);
        books.truncate(page_size as usize);

        Ok(CatalogPage { books, total_items })
    }

    /// Direct `isbn:` lookup, first hit only.
    pub async fn lookup_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let mut url = format!(
            "{}/volumes?q=isbn:{}&maxResults=1",
            self.base_url,
            urlencoding::encode(isbn)
        );
        self.append_key(&mut url);

        let json = self.http.get_json(&url).await?;
        Ok(json
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .map(volume_to_book))
    }

    /// Discovery feed: broad fiction query, relevance order surfaces
    /// well-known titles.
    pub async fn popular(&self) -> Result<Vec<Book>> {
        let mut url = format!(
            "{}/volumes?q=fiction&orderBy=relevance&printType=books&maxResults={FEED_LIMIT}",
            self.base_url
        );
        self.append_key(&mut url);

        let json = self.http.get_json(&url).await?;
        Ok(parse_volumes(&json))
    }

    /// Discovery feed: newest fiction, cut to publication years within
    /// [`RECENT_WINDOW_YEARS`] of now. The newest ordering upstream is noisy,
    /// hence the larger scan pool and the client-side year cut.
    pub async fn recent(&self) -> Result<Vec<Book>> {
        let mut url = format!(
            "{}/volumes?q={}&orderBy=newest&printType=books&maxResults={RECENT_SCAN_LIMIT}",
            self.base_url,
            urlencoding::encode("subject:fiction")
        );
        self.append_key(&mut url);

        let json = self.http.get_json(&url).await?;
        let min_year = Utc::now().year() - RECENT_WINDOW_YEARS;

        let mut books: Vec<Book> = parse_volumes(&json)
            .into_iter()
            .filter(|book| {
                book.published_year
                    .parse::<i32>()
                    .map(|year| year >= min_year)
                    .unwrap_or(false)
            })
            .collect();
        books.truncate(FEED_LIMIT);
        Ok(books)
    }

    fn append_key(&self, url: &mut String) {
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
    }
}

#[async_trait]
impl BookProvider for CatalogClient {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn search(&self, query: &str) -> Vec<Book> {
        match self.search_volumes(query, 0, PROVIDER_RESULT_LIMIT).await {
            Ok(page) => page.books,
            Err(err) => {
                warn!("catalog search failed for {query:?}: {err}");
                Vec::new()
            }
        }
    }

    async fn get_by_isbn(&self, isbn: &str) -> Option<Book> {
        match self.lookup_isbn(isbn).await {
            Ok(book) => book,
            Err(err) => {
                warn!("catalog ISBN lookup failed for {isbn}: {err}");
                None
            }
        }
    }
}

// ─── Normalization ──────────────────────────────────────────

fn parse_volumes(json: &Value) -> Vec<Book> {
    json.get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(volume_to_book).collect())
        .unwrap_or_default()
}

fn volume_to_book(item: &Value) -> Book {
    let info = item.get("volumeInfo").unwrap_or(&Value::Null);

    let id = item
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let title = text_field(info, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut book = Book::new(id, title, Source::Catalog);

    book.authors = info
        .get("authors")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]);

    book.description =
        text_field(info, "description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    book.image = info
        .get("imageLinks")
        .map(|links| {
            text_field(links, "thumbnail")
                .or_else(|| text_field(links, "smallThumbnail"))
                .map(|u| secure_url(&u))
                .unwrap_or_default()
        })
        .unwrap_or_default();

    book.published_year = text_field(info, "publishedDate")
        .map(|date| date.split('-').next().unwrap_or_default().to_string())
        .unwrap_or_else(|| YEAR_UNKNOWN.to_string());

    book.preview_link = text_field(info, "previewLink")
        .or_else(|| text_field(info, "infoLink"))
        .unwrap_or_else(|| DEFAULT_PREVIEW_LINK.to_string());

    book.isbn = extract_isbn(info);
    book.publisher = text_field(info, "publisher");
    book.page_count = info
        .get("pageCount")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .filter(|&n| n > 0);
    book.subjects = info
        .get("categories")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    book
}

/// ISBN-13 preferred, ISBN-10 as fallback.
fn extract_isbn(info: &Value) -> Option<String> {
    let ids = info.get("industryIdentifiers").and_then(Value::as_array)?;
    let find = |kind: &str| {
        ids.iter()
            .find(|id| id.get("type").and_then(Value::as_str) == Some(kind))
            .and_then(|id| text_field(id, "identifier"))
    };
    find("ISBN_13").or_else(|| find("ISBN_10"))
}

fn secure_url(url: &str) -> String {
    url.replacen("http:", "https:", 1)
}

// ─── Tests ──────────────────────────────────────────────────
