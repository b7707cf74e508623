//! Core models and ranking logic for the bookscout discovery pipeline.
//!
//! Everything here is pure: no IO, no async. The canonical [`Book`] record,
//! the relevance scorer, the junk filter and result grouping all operate on
//! values the discovery layer hands them.

pub mod book;
pub mod filter;
pub mod grouping;
pub mod relevance;

pub use book::{Book, BuyLink, Source};
pub use grouping::GroupedBooks;
