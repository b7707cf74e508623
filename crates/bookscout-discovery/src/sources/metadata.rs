use serde_json::Value;

use crate::error::Result;
use crate::http::ApiClient;
use crate::sources::text_field;

const BASE_URL: &str = "https://openlibrary.org/api/books";

/// Upstream subject lists run long; keep the head.
const SUBJECT_LIMIT: usize = 5;

// ─── BookFacts ──────────────────────────────────────────────

/// Bibliographic facts for one ISBN, as far as the metadata source knows
/// them. Everything is optional; enrichment only fills gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFacts {
    pub publisher: Option<String>,
    pub published_year: Option<String>,
    pub page_count: Option<u32>,
    pub subjects: Vec<String>,
    pub image: Option<String>,
}

impl BookFacts {
    pub fn from_json(data: &Value) -> Self {
        let publisher = data
            .get("publishers")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(|p| text_field(p, "name"));
        let published_year =
            text_field(data, "publish_date").and_then(|date| extract_year(&date));
        let page_count = data
            .get("number_of_pages")
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .filter(|&n| n > 0);
        let subjects = data
            .get("subjects")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .take(SUBJECT_LIMIT)
                    .filter_map(|s| text_field(s, "name"))
                    .collect()
            })
            .unwrap_or_default();
        let image = data
            .get("cover")
            .and_then(|c| text_field(c, "large").or_else(|| text_field(c, "medium")));

        Self {
            publisher,
            published_year,
            page_count,
            subjects,
            image,
        }
    }
}

// ─── MetadataClient ─────────────────────────────────────────

/// Client for the open bibliographic database (Open Library Books API).
pub struct MetadataClient {
    http: ApiClient,
    base_url: String,
}

impl MetadataClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: ApiClient::new(),
            base_url,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(base_url: String) -> Self {
        Self::with_base_url(base_url)
    }

    /// Look up one ISBN. `Ok(None)` when the source has never heard of it
    /// (the response is an empty object rather than an error).
    pub async fn lookup(&self, isbn: &str) -> Result<Option<BookFacts>> {
        if isbn.is_empty() {
            return Ok(None);
        }

        let bibkey = format!("ISBN:{isbn}");
        let url = format!(
            "{}?bibkeys={bibkey}&jscmd=data&format=json",
            self.base_url
        );
        let json = self.http.get_json(&url).await?;
        Ok(json.get(&bibkey).map(BookFacts::from_json))
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new()
    }
}

/// First run of four consecutive digits in a free-form date string.
/// Publish dates arrive as "1965", "August 1965", "1965-08-01" and worse.
fn extract_year(date: &str) -> Option<String> {
    let chars: Vec<char> = date.chars().collect();
    chars
        .windows(4)
        .find(|w| w.iter().all(char::is_ascii_digit))
        .map(|w| w.iter().collect())
}

// ─── Tests ──────────────────────────────────────────────────
