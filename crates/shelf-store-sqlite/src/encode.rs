//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, book metadata as compact JSON
//! and checkout actions as their snake_case discriminant.

use chrono::{DateTime, Utc};
use shelf_core::{
  book::{Book, BookDetails},
  checkout::{CheckoutAction, CheckoutEvent},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── BookDetails ─────────────────────────────────────────────────────────────

pub fn encode_details(d: &BookDetails) -> Result<String> {
  Ok(serde_json::to_string(d)?)
}

pub fn decode_details(s: &str) -> Result<BookDetails> {
  Ok(serde_json::from_str(s)?)
}

// ─── CheckoutAction ──────────────────────────────────────────────────────────

pub fn decode_action(s: &str) -> Result<CheckoutAction> {
  CheckoutAction::from_discriminant(s)
    .ok_or_else(|| Error::UnknownAction(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawBook`].
pub const BOOK_COLUMNS: &str =
  "book_id, title, author, available, last_checkout, details_json";

/// Raw values read directly from a `books` row.
pub struct RawBook {
  pub book_id:       String,
  pub title:         String,
  pub author:        String,
  pub available:     bool,
  pub last_checkout: Option<String>,
  pub details_json:  String,
}

impl RawBook {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      book_id:       row.get(0)?,
      title:         row.get(1)?,
      author:        row.get(2)?,
      available:     row.get(3)?,
      last_checkout: row.get(4)?,
      details_json:  row.get(5)?,
    })
  }

  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      book_id:       self.book_id.into(),
      title:         self.title,
      author:        self.author,
      available:     self.available,
      last_checkout: self.last_checkout.as_deref().map(decode_dt).transpose()?,
      details:       decode_details(&self.details_json)?,
    })
  }
}

/// Column list matching the field order of [`RawEvent`].
pub const EVENT_COLUMNS: &str = "book_id, action, recorded_at";

/// Raw strings read directly from a `checkout_events` row.
pub struct RawEvent {
  pub book_id:     String,
  pub action:      String,
  pub recorded_at: String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      book_id:     row.get(0)?,
      action:      row.get(1)?,
      recorded_at: row.get(2)?,
    })
  }

  pub fn into_event(self) -> Result<CheckoutEvent> {
    Ok(CheckoutEvent {
      book_id:     self.book_id.into(),
      action:      decode_action(&self.action)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
