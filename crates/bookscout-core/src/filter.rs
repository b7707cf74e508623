//! Junk filtering for catalog search results.
//!
//! Broad catalog queries surface scanned institutional material (committee
//! hearings, annual reports, course catalogs) alongside actual books. The
//! filter drops those plus anything without a usable title or author.

use crate::book::{Book, UNKNOWN_AUTHOR};

/// Title terms that mark bureaucratic/institutional records.
pub const JUNK_KEYWORDS: [&str; 14] = [
    "court",
    "division",
    "department",
    "committee",
    "hearings",
    "proceedings",
    "catalog",
    "records",
    "report",
    "symposium",
    "legislature",
    "bureau",
    "administration",
    "calendar",
];

/// Whether a record should be kept. Rejects empty titles, missing or
/// placeholder authors, and titles containing any denylist term.
pub fn is_acceptable(book: &Book) -> bool {
    if book.title.is_empty() {
        return false;
    }
    if book.authors.is_empty() || book.authors[0] == UNKNOWN_AUTHOR {
        return false;
    }

    let title = book.title.to_lowercase();
    !JUNK_KEYWORDS.iter().any(|keyword| title.contains(keyword))
}

/// Keep only acceptable records, preserving order.
pub fn filter_junk(books: Vec<Book>) -> Vec<Book> {
    books.into_iter().filter(is_acceptable).collect()
}

// ─── Tests ──────────────────────────────────────────────────
