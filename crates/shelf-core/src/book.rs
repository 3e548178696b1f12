//! Book records — the catalog entries whose availability the checkout core
//! tracks.
//!
//! Only `book_id` and `available` matter to the checkout state machine. The
//! rest is catalog metadata carried through the store untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Globally unique identifier of a book. Assigned at creation, never
/// reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
  /// A fresh identifier backed by a random UUID.
  pub fn generate() -> Self { Self(Uuid::new_v4().hyphenated().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BookId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for BookId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for BookId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Descriptive catalog metadata. Every field is optional; none of it affects
/// checkout behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookDetails {
  pub genre:            Option<String>,
  pub publication_year: Option<i32>,
  pub page_count:       Option<u32>,
  pub average_rating:   Option<f64>,
  pub ratings_count:    Option<u64>,
  pub price_usd:        Option<f64>,
  pub publisher:        Option<String>,
  pub language:         Option<String>,
  pub format:           Option<String>,
  pub in_print:         Option<bool>,
  pub sales_millions:   Option<f64>,
  pub publisher_email:  Option<String>,
}

// ─── Book ────────────────────────────────────────────────────────────────────

/// A catalog record.
///
/// `available` must agree with the ledger: it is `false` exactly when the
/// book's latest checkout event is a check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
  pub book_id:       BookId,
  pub title:         String,
  pub author:        String,
  pub available:     bool,
  /// When the book was most recently checked out, if ever.
  pub last_checkout: Option<DateTime<Utc>>,
  pub details:       BookDetails,
}

impl fmt::Display for Book {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = if self.available { "available" } else { "checked out" };
    write!(
      f,
      "{} | {} | {} | ID: {}",
      self.title, self.author, state, self.book_id
    )
  }
}

// ─── NewBook ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::BookStore::add_book`].
///
/// New books always start available; `available` is not accepted from
/// callers.
#[derive(Debug, Clone)]
pub struct NewBook {
  /// Caller-chosen identifier. The store generates one when `None`.
  pub book_id: Option<BookId>,
  pub title:   String,
  pub author:  String,
  pub details: BookDetails,
}

impl NewBook {
  /// Convenience constructor with no explicit id and empty metadata.
  pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
    Self {
      book_id: None,
      title:   title.into(),
      author:  author.into(),
      details: BookDetails::default(),
    }
  }

  pub fn with_id(mut self, id: impl Into<BookId>) -> Self {
    self.book_id = Some(id.into());
    self
  }

  /// Materialise the record a store will persist.
  pub fn into_book(self) -> Book {
    Book {
      book_id:       self.book_id.unwrap_or_else(BookId::generate),
      title:         self.title,
      author:        self.author,
      available:     true,
      last_checkout: None,
      details:       self.details,
    }
  }
}
