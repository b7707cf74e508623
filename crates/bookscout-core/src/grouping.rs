//! Partition a ranked result list into display tiers.

use serde::Serialize;

use crate::book::Book;

/// Minimum score for the "related" tier.
pub const RELATED_SCORE_THRESHOLD: u32 = 50;

/// Query-scoped view over a ranked result list.
///
/// `top_match` is the first element unconditionally: the best available
/// candidate is always surfaced even when its score is low. Built by
/// [`group`], never assembled by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedBooks {
    pub top_match: Option<Book>,
    pub related: Vec<Book>,
    pub others: Vec<Book>,
}

/// Group a list that is already ranked (descending score, stable).
///
/// After the top match, entries scoring at least
/// [`RELATED_SCORE_THRESHOLD`] land in `related`, the rest in `others`,
/// both keeping their incoming order.
pub fn group(books: Vec<Book>) -> GroupedBooks {
    let mut books = books.into_iter();
    let Some(top) = books.next() else {
        return GroupedBooks::default();
    };

    let mut related = Vec::new();
    let mut others = Vec::new();
    for book in books {
        if book.relevance_score.unwrap_or(0) >= RELATED_SCORE_THRESHOLD {
            related.push(book);
        } else {
            others.push(book);
        }
    }

    GroupedBooks {
        top_match: Some(top),
        related,
        others,
    }
}

// ─── Tests ──────────────────────────────────────────────────
