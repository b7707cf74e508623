use serde::{Deserialize, Serialize};

/// Placeholder title for records the provider returned without one.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Placeholder author; also what the junk filter rejects.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
/// Placeholder description for list and volume records.
pub const DEFAULT_DESCRIPTION: &str = "No description available.";
/// Placeholder description for review records, which carry a summary instead.
pub const DEFAULT_REVIEW_SUMMARY: &str = "No review summary available.";
/// Sentinel for an unknown publication year.
pub const YEAR_UNKNOWN: &str = "N/A";
/// Fallback preview link for catalog records with no usable URL.
pub const DEFAULT_PREVIEW_LINK: &str = "#";

// ─── Book ───────────────────────────────────────────────────

/// Canonical book record, normalized from any provider's response schema.
///
/// `id` is provider-scoped (catalog volume id, or the curated source's
/// primary ISBN with a title fallback) and only unique within one provider.
/// `isbn` is the cross-source identity used for deduplication and enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,

    /// Cover URL, empty when no source supplied one.
    pub image: String,

    /// 4-digit year, or [`YEAR_UNKNOWN`].
    pub published_year: String,

    pub preview_link: String,

    /// ISBN-13 preferred over ISBN-10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    /// Category strings, set semantics. Empty means none known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,

    /// Computed per query, never carried across queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u32>,

    pub source: Source,

    // Curated-list fields, absent for catalog and review records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_last_week: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks_on_list: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buy_links: Vec<BuyLink>,
}

impl Book {
    /// Create a record with the given identity and all other fields at their
    /// documented defaults. Normalization code fills in what the provider
    /// actually returned.
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            description: DEFAULT_DESCRIPTION.to_string(),
            image: String::new(),
            published_year: YEAR_UNKNOWN.to_string(),
            preview_link: String::new(),
            isbn: None,
            publisher: None,
            page_count: None,
            subjects: Vec::new(),
            relevance_score: None,
            source,
            rank: None,
            rank_last_week: None,
            weeks_on_list: None,
            amazon_url: None,
            buy_links: Vec::new(),
        }
    }

    /// Whether the publication year is the unknown sentinel.
    pub fn year_is_unknown(&self) -> bool {
        self.published_year == YEAR_UNKNOWN
    }
}

// ─── Source ─────────────────────────────────────────────────

/// Which kind of provider produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Broad algorithmic volume search.
    Catalog,
    /// Editorial best-seller lists and reviews.
    Curated,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Curated => write!(f, "curated"),
        }
    }
}

// ─── BuyLink ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyLink {
    pub name: String,
    pub url: String,
}

// ─── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new_defaults() {
        let book = Book::new("vol1", "The Left Hand of Darkness", Source::Catalog);
        assert_eq!(book.id, "vol1");
        assert_eq!(book.description, DEFAULT_DESCRIPTION);
        assert!(book.year_is_unknown());
        assert!(book.authors.is_empty());
        assert!(book.isbn.is_none());
        assert!(book.buy_links.is_empty());
    }

    #[test]
    fn test_book_json_roundtrip() {
        let mut book = Book::new("9780441007318", "Neuromancer", Source::Curated);
        book.authors = vec!["William Gibson".to_string()];
        book.isbn = Some("9780441007318".to_string());
        book.rank = Some(3);
        book.buy_links = vec![BuyLink {
            name: "Bookshop".to_string(),
            url: "https://example.org/neuromancer".to_string(),
        }];

        let json = serde_json::to_string(&book).unwrap();
        let restored: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, book);
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let book = Book::new("vol1", "Dune", Source::Catalog);
        let json = serde_json::to_string(&book).unwrap();
        assert!(!json.contains("isbn"));
        assert!(!json.contains("rank"));
        assert!(!json.contains("subjects"));
        assert!(json.contains("\"source\":\"catalog\""));
    }
}
