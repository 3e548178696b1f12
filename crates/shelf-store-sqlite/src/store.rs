//! [`SqliteStore`] — the SQLite implementation of [`BookStore`] and
//! [`CheckoutLedger`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use shelf_core::{
  book::{Book, BookId, NewBook},
  checkout::{CheckoutAction, CheckoutEvent},
  store::{BookStore, CheckoutLedger},
};

use crate::{
  Error, Result,
  encode::{
    BOOK_COLUMNS, EVENT_COLUMNS, RawBook, RawEvent, decode_action, encode_details,
    encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Shelf catalog and checkout ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn conn_for_tests(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_books(
    &self,
    sql: String,
    title: Option<String>,
  ) -> Result<Vec<Book>> {
    let raws: Vec<RawBook> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match title {
          Some(t) => stmt
            .query_map(rusqlite::params![t], RawBook::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawBook::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBook::into_book).collect()
  }

  async fn query_events(
    &self,
    sql: String,
    book_id: Option<String>,
  ) -> Result<Vec<CheckoutEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match book_id {
          Some(id) => stmt
            .query_map(rusqlite::params![id], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── BookStore impl ──────────────────────────────────────────────────────────

impl BookStore for SqliteStore {
  type Error = Error;

  async fn get_all_books(&self) -> Result<Vec<Book>> {
    self
      .query_books(format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY seq"), None)
      .await
  }

  async fn update_book(&self, book: &Book) -> Result<bool> {
    let id_str        = book.book_id.to_string();
    let title         = book.title.clone();
    let author        = book.author.clone();
    let available     = book.available;
    let last_checkout = book.last_checkout.map(encode_dt);
    let details_str   = encode_details(&book.details)?;

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE books
           SET title = ?2, author = ?3, available = ?4,
               last_checkout = ?5, details_json = ?6
           WHERE book_id = ?1",
          rusqlite::params![id_str, title, author, available, last_checkout, details_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn add_book(&self, input: NewBook) -> Result<Book> {
    let book = input.into_book();

    let id_str        = book.book_id.to_string();
    let title         = book.title.clone();
    let author        = book.author.clone();
    let available     = book.available;
    let last_checkout = book.last_checkout.map(encode_dt);
    let details_str   = encode_details(&book.details)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO books (book_id, title, author, available, last_checkout, details_json)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, title, author, available, last_checkout, details_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(book)
  }

  async fn find_books_by_title(&self, title: &str) -> Result<Vec<Book>> {
    self
      .query_books(
        format!("SELECT {BOOK_COLUMNS} FROM books WHERE title = ?1 ORDER BY seq"),
        Some(title.to_owned()),
      )
      .await
  }

  async fn delete_book(&self, id: &BookId) -> Result<bool> {
    let id_str = id.to_string();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM books WHERE book_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(removed > 0)
  }
}

// ─── CheckoutLedger impl ─────────────────────────────────────────────────────

impl CheckoutLedger for SqliteStore {
  type Error = Error;

  async fn append(&self, event: CheckoutEvent) -> Result<()> {
    let id_str     = event.book_id.to_string();
    let action_str = event.action.discriminant();
    let at_str     = encode_dt(event.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO checkout_events (book_id, action, recorded_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, action_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn history_for(&self, book_id: &BookId) -> Result<Vec<CheckoutEvent>> {
    self
      .query_events(
        format!(
          "SELECT {EVENT_COLUMNS} FROM checkout_events WHERE book_id = ?1 ORDER BY seq"
        ),
        Some(book_id.to_string()),
      )
      .await
  }

  async fn history_all(&self) -> Result<Vec<CheckoutEvent>> {
    self
      .query_events(
        format!("SELECT {EVENT_COLUMNS} FROM checkout_events ORDER BY seq"),
        None,
      )
      .await
  }

  async fn latest_action_for(&self, book_id: &BookId) -> Result<Option<CheckoutAction>> {
    let id_str = book_id.to_string();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT action FROM checkout_events WHERE book_id = ?1
             ORDER BY seq DESC LIMIT 1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_action).transpose()
  }
}
