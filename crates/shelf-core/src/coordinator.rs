//! [`CheckoutCoordinator`] — one user-visible check-out or check-in as a
//! single logical operation.
//!
//! Each operation runs four steps under a per-book lock:
//!
//! 1. find the book by a linear scan of [`BookStore::get_all_books`];
//! 2. apply the state-machine transition in memory;
//! 3. persist the book with [`BookStore::update_book`];
//! 4. append the event to the [`CheckoutLedger`].
//!
//! The book is persisted before the event is appended. If step 4 fails the
//! book's availability is already correct and the ledger is one event short;
//! [`CheckoutCoordinator::reconcile`] reports that divergence. Failures in
//! steps 1–3 never reach the ledger.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
  Error, Result,
  book::{Book, BookId},
  checkout::{Availability, CheckoutAction, CheckoutEvent},
  store::{BookStore, CheckoutLedger},
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// Whether a book's `available` flag agrees with its latest ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Consistency {
  Consistent,
  /// The flag and the ledger disagree, e.g. after a crash between persisting
  /// the book and appending its event.
  Diverged {
    available: bool,
    latest:    Option<CheckoutAction>,
  },
}

impl Consistency {
  fn check(available: bool, latest: Option<CheckoutAction>) -> Self {
    let out_per_ledger = latest == Some(CheckoutAction::CheckOut);
    if out_per_ledger == !available {
      Self::Consistent
    } else {
      Self::Diverged { available, latest }
    }
  }

  pub fn is_consistent(&self) -> bool { matches!(self, Self::Consistent) }
}

/// A book together with what the ledger says about it.
#[derive(Debug, Clone, Serialize)]
pub struct BookStatus {
  pub book:          Book,
  pub availability:  Availability,
  /// Timestamp of the most recent check-in, if the book was ever returned.
  pub last_returned: Option<DateTime<Utc>>,
  pub consistency:   Consistency,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Composes the state machine, a [`BookStore`] and a [`CheckoutLedger`].
///
/// Operations on the same book id are serialised; operations on different
/// books run independently. A book's lock entry is dropped once no operation
/// holds or waits for it.
pub struct CheckoutCoordinator<B, L> {
  books:  B,
  ledger: L,
  locks:  LockMap,
}

impl<B, L> CheckoutCoordinator<B, L>
where
  B: BookStore,
  L: CheckoutLedger,
{
  pub fn new(books: B, ledger: L) -> Self {
    Self { books, ledger, locks: Mutex::new(HashMap::new()) }
  }

  /// The underlying book store, for catalog operations outside checkout.
  pub fn books(&self) -> &B { &self.books }

  pub fn ledger(&self) -> &L { &self.ledger }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Check out an available book and return the recorded event.
  pub async fn check_out(&self, book_id: &BookId) -> Result<CheckoutEvent> {
    self.transition(book_id, CheckoutAction::CheckOut).await
  }

  /// Check in a checked-out book and return the recorded event.
  pub async fn check_in(&self, book_id: &BookId) -> Result<CheckoutEvent> {
    self.transition(book_id, CheckoutAction::CheckIn).await
  }

  async fn transition(
    &self,
    book_id: &BookId,
    action: CheckoutAction,
  ) -> Result<CheckoutEvent> {
    let _guard = self.lock(book_id).await;

    let mut book = self.find_book(book_id).await?;

    if let Err(e) = action.apply(&mut book) {
      tracing::warn!(%book_id, %action, "rejected transition: {e}");
      return Err(e);
    }

    let event = CheckoutEvent::new(book.book_id.clone(), action);
    if action == CheckoutAction::CheckOut {
      book.last_checkout = Some(event.recorded_at);
    }

    let replaced = self
      .books
      .update_book(&book)
      .await
      .map_err(Error::storage)?;
    if !replaced {
      // Removed between the scan and the write; nothing was persisted.
      return Err(Error::NotFound(book_id.clone()));
    }

    if let Err(e) = self.ledger.append(event.clone()).await {
      tracing::warn!(
        %book_id,
        %action,
        "book persisted but ledger append failed: {e}"
      );
      return Err(Error::storage(e));
    }

    tracing::info!(%book_id, %action, at = %event.recorded_at, "recorded checkout event");
    Ok(event)
  }

  // ── Catalog edits ─────────────────────────────────────────────────────────

  /// Re-read the book under its lock, apply `edit` and persist the result.
  ///
  /// Only catalog fields change: `book_id`, `available` and `last_checkout`
  /// are taken from the freshly read record, whatever `edit` does to them.
  pub async fn edit_catalog<F>(&self, book_id: &BookId, edit: F) -> Result<Book>
  where
    F: FnOnce(&mut Book) + Send,
  {
    let _guard = self.lock(book_id).await;

    let current = self.find_book(book_id).await?;
    let mut edited = current.clone();
    edit(&mut edited);
    edited.book_id = current.book_id;
    edited.available = current.available;
    edited.last_checkout = current.last_checkout;

    let replaced = self
      .books
      .update_book(&edited)
      .await
      .map_err(Error::storage)?;
    if !replaced {
      return Err(Error::NotFound(book_id.clone()));
    }

    tracing::info!(%book_id, "updated catalog record");
    Ok(edited)
  }

  // ── History ───────────────────────────────────────────────────────────────

  pub async fn history_for_book(&self, book_id: &BookId) -> Result<Vec<CheckoutEvent>> {
    self.ledger.history_for(book_id).await.map_err(Error::storage)
  }

  pub async fn history_all(&self) -> Result<Vec<CheckoutEvent>> {
    self.ledger.history_all().await.map_err(Error::storage)
  }

  // ── Consistency ───────────────────────────────────────────────────────────

  /// Compare the persisted `available` flag with the ledger's latest event.
  pub async fn reconcile(&self, book_id: &BookId) -> Result<Consistency> {
    let _guard = self.lock(book_id).await;

    let book = self.find_book(book_id).await?;
    let latest = self
      .ledger
      .latest_action_for(book_id)
      .await
      .map_err(Error::storage)?;

    let consistency = Consistency::check(book.available, latest);
    if !consistency.is_consistent() {
      tracing::warn!(%book_id, ?consistency, "book and ledger disagree");
    }
    Ok(consistency)
  }

  /// The book, its availability and when it was last returned.
  pub async fn status(&self, book_id: &BookId) -> Result<BookStatus> {
    let _guard = self.lock(book_id).await;

    let book = self.find_book(book_id).await?;
    let history = self.history_for_book(book_id).await?;

    let last_returned = history
      .iter()
      .rev()
      .find(|e| e.action == CheckoutAction::CheckIn)
      .map(|e| e.recorded_at);
    let consistency =
      Consistency::check(book.available, history.last().map(|e| e.action));

    Ok(BookStatus {
      availability: Availability::of(&book),
      book,
      last_returned,
      consistency,
    })
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// First book whose id matches; the store is scanned linearly.
  async fn find_book(&self, book_id: &BookId) -> Result<Book> {
    self
      .books
      .get_all_books()
      .await
      .map_err(Error::storage)?
      .into_iter()
      .find(|b| &b.book_id == book_id)
      .ok_or_else(|| Error::NotFound(book_id.clone()))
  }

  async fn lock(&self, book_id: &BookId) -> BookGuard<'_> {
    let slot = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      locks.entry(book_id.clone()).or_default().clone()
    };
    BookGuard {
      locks:   &self.locks,
      book_id: book_id.clone(),
      guard:   Some(slot.lock_owned().await),
    }
  }

  #[cfg(test)]
  pub(crate) fn lock_count(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

// ─── Per-book lock ───────────────────────────────────────────────────────────

type LockMap = Mutex<HashMap<BookId, Arc<AsyncMutex<()>>>>;

/// Holds one book's lock; on drop, removes the map entry if nobody else holds
/// or waits for it.
struct BookGuard<'a> {
  locks:   &'a LockMap,
  book_id: BookId,
  guard:   Option<OwnedMutexGuard<()>>,
}

impl Drop for BookGuard<'_> {
  fn drop(&mut self) {
    // Release first so the map holds the only remaining reference.
    drop(self.guard.take());
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    if locks
      .get(&self.book_id)
      .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
      locks.remove(&self.book_id);
    }
  }
}
