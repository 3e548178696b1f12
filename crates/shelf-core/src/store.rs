//! The `BookStore` and `CheckoutLedger` traits.
//!
//! Both are implemented by storage backends (e.g. `shelf-store-sqlite`).
//! [`crate::coordinator::CheckoutCoordinator`] and the console depend on these
//! abstractions, not on any concrete backend.

use std::future::Future;

use crate::{
  book::{Book, BookId, NewBook},
  checkout::{CheckoutAction, CheckoutEvent},
};

// ─── Book store ──────────────────────────────────────────────────────────────

/// Abstraction over a catalog of book records.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait BookStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every book in the catalog, in insertion order.
  fn get_all_books(
    &self,
  ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send + '_;

  /// Replace the stored record whose id matches `book.book_id`.
  ///
  /// Returns `true` iff such a record existed and was replaced.
  fn update_book<'a>(
    &'a self,
    book: &'a Book,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Persist a new book and return it. The book always starts available.
  fn add_book(
    &self,
    input: NewBook,
  ) -> impl Future<Output = Result<Book, Self::Error>> + Send + '_;

  /// Books whose title equals `title` exactly.
  fn find_books_by_title<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send + 'a;

  /// Remove a book record. Returns `true` iff a record was removed.
  /// Checkout history for the book is kept.
  fn delete_book<'a>(
    &'a self,
    id: &'a BookId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Durable, append-only log of checkout events.
///
/// Insertion order is the only ordering guarantee. Two events may carry the
/// same timestamp; backends must never re-sort by it.
pub trait CheckoutLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Add `event` to the end of the log.
  fn append(
    &self,
    event: CheckoutEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All events for one book, oldest first. Empty when there are none.
  fn history_for<'a>(
    &'a self,
    book_id: &'a BookId,
  ) -> impl Future<Output = Result<Vec<CheckoutEvent>, Self::Error>> + Send + 'a;

  /// Every event across all books, oldest first.
  fn history_all(
    &self,
  ) -> impl Future<Output = Result<Vec<CheckoutEvent>, Self::Error>> + Send + '_;

  /// The action of the most recently appended event for the book.
  fn latest_action_for<'a>(
    &'a self,
    book_id: &'a BookId,
  ) -> impl Future<Output = Result<Option<CheckoutAction>, Self::Error>> + Send + 'a;
}
