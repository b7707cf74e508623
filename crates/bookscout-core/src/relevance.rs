//! Relevance scoring for search results.
//!
//! The score is the sole ranking key within a source. Sorting is stable, so
//! equal scores keep the provider's original order.

use crate::book::Book;

/// Exact title match.
const EXACT_TITLE: u32 = 100;
/// Query appears inside the title.
const PARTIAL_TITLE: u32 = 70;
/// No substring match, but a significant query word appears in the title.
const KEYWORD_OVERLAP: u32 = 15;
/// Query appears inside an author name. Additive with the title rules.
const AUTHOR_MATCH: u32 = 40;

/// Score one candidate against a query. Case-insensitive; the query is
/// whitespace-trimmed first. 0 means no match signal at all.
pub fn score(book: &Book, query: &str) -> u32 {
    let query = query.trim().to_lowercase();
    let title = book.title.to_lowercase();

    let mut score = 0;

    if title == query {
        score += EXACT_TITLE;
    } else if title.contains(&query) {
        score += PARTIAL_TITLE;
    } else {
        // Only words longer than 3 chars count, to keep "the"/"of" noise out.
        let title_words: Vec<&str> = title.split_whitespace().collect();
        let overlap = query
            .split_whitespace()
            .any(|word| word.chars().count() > 3 && title_words.contains(&word));
        if overlap {
            score += KEYWORD_OVERLAP;
        }
    }

    if book
        .authors
        .iter()
        .any(|author| author.to_lowercase().contains(&query))
    {
        score += AUTHOR_MATCH;
    }

    score
}

/// Attach a score to every book and stable-sort descending.
pub fn rank(mut books: Vec<Book>, query: &str) -> Vec<Book> {
    for book in &mut books {
        book.relevance_score = Some(score(book, query));
    }
    books.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    books
}

// ─── Tests ──────────────────────────────────────────────────
