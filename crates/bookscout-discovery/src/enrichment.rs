//! Gap-filling enrichment from the metadata source.
//!
//! Search results arrive with holes: review hits have no cover or page
//! count, list entries have no publication year. For every record that
//! carries an ISBN we ask the metadata source for facts and fill in
//! whatever is still missing. Existing values always win.

use std::sync::Arc;

use bookscout_core::book::{Book, YEAR_UNKNOWN};
use futures::future::join_all;
use tracing::warn;

use crate::sources::{BookFacts, MetadataClient};

#[derive(Clone)]
pub struct Enricher {
    metadata: Arc<MetadataClient>,
}

impl Enricher {
    pub fn new(metadata: Arc<MetadataClient>) -> Self {
        Self { metadata }
    }

    /// Enrich one record. Never fatal: records without an ISBN skip the
    /// lookup, and a failed lookup leaves the record as it was.
    pub async fn enrich(&self, book: Book) -> Book {
        let Some(isbn) = book.isbn.clone() else {
            return book;
        };
        match self.metadata.lookup(&isbn).await {
            Ok(Some(facts)) => merge_facts(book, facts),
            Ok(None) => book,
            Err(err) => {
                warn!("metadata lookup failed for ISBN {isbn}: {err}");
                book
            }
        }
    }

    /// Enrich a whole result set with every lookup in flight at once.
    /// Output order matches input order.
    pub async fn enrich_all(&self, books: Vec<Book>) -> Vec<Book> {
        join_all(books.into_iter().map(|book| self.enrich(book))).await
    }
}

/// The record wins, facts fill gaps. Subjects are the exception and are
/// unioned, keeping the record's entries first.
fn merge_facts(mut book: Book, facts: BookFacts) -> Book {
    book.publisher = book.publisher.or(facts.publisher);
    if book.year_is_unknown() {
        book.published_year = facts
            .published_year
            .unwrap_or_else(|| YEAR_UNKNOWN.to_string());
    }
    book.page_count = book.page_count.or(facts.page_count);
    for subject in facts.subjects {
        if !book.subjects.contains(&subject) {
            book.subjects.push(subject);
        }
    }
    if book.image.is_empty() {
        book.image = facts.image.unwrap_or_default();
    }
    book
}

// ─── Tests ──────────────────────────────────────────────────
