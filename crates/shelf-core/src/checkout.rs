//! The checkout state machine and the events it produces.
//!
//! A book is either available or checked out. The only legal moves are
//! `Available --check_out--> CheckedOut --check_in--> Available`. Every
//! successful move is recorded as one immutable [`CheckoutEvent`]; past events
//! are never rewritten.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  book::{Book, BookId},
};

// ─── States ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
  Available,
  CheckedOut,
}

impl Availability {
  pub fn of(book: &Book) -> Self {
    if book.available {
      Self::Available
    } else {
      Self::CheckedOut
    }
  }
}

impl fmt::Display for Availability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Available => "available",
      Self::CheckedOut => "checked out",
    })
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The two transitions a ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutAction {
  CheckOut,
  CheckIn,
}

impl CheckoutAction {
  /// The discriminant string stored by ledger backends.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::CheckOut => "check_out",
      Self::CheckIn => "check_in",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    match s {
      "check_out" => Some(Self::CheckOut),
      "check_in" => Some(Self::CheckIn),
      _ => None,
    }
  }

  /// State a book must be in for this action to be legal.
  pub fn source(&self) -> Availability {
    match self {
      Self::CheckOut => Availability::Available,
      Self::CheckIn => Availability::CheckedOut,
    }
  }

  /// State a book is in after this action.
  pub fn target(&self) -> Availability {
    match self {
      Self::CheckOut => Availability::CheckedOut,
      Self::CheckIn => Availability::Available,
    }
  }

  /// Apply the transition to `book` in memory. On failure `book` is left
  /// untouched.
  pub fn apply(self, book: &mut Book) -> Result<()> {
    let state = Availability::of(book);
    if state != self.source() {
      return Err(Error::InvalidTransition {
        book_id: book.book_id.clone(),
        state,
        action: self,
      });
    }
    book.available = self.target() == Availability::Available;
    Ok(())
  }
}

impl fmt::Display for CheckoutAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::CheckOut => "check out",
      Self::CheckIn => "check in",
    })
  }
}

/// `Available → CheckedOut`.
pub fn check_out(book: &mut Book) -> Result<()> {
  CheckoutAction::CheckOut.apply(book)
}

/// `CheckedOut → Available`.
pub fn check_in(book: &mut Book) -> Result<()> {
  CheckoutAction::CheckIn.apply(book)
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One recorded transition of one book. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutEvent {
  /// Refers to a book; the ledger does not own it.
  pub book_id:     BookId,
  pub action:      CheckoutAction,
  pub recorded_at: DateTime<Utc>,
}

impl CheckoutEvent {
  pub fn new(book_id: BookId, action: CheckoutAction) -> Self {
    Self { book_id, action, recorded_at: Utc::now() }
  }
}

impl fmt::Display for CheckoutEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self.action {
      CheckoutAction::CheckOut => "Checked out",
      CheckoutAction::CheckIn => "Returned",
    };
    write!(f, "{label} at {}", self.recorded_at.to_rfc3339())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::book::NewBook;

  fn book() -> Book { NewBook::new("Dune", "Frank Herbert").with_id("b1").into_book() }

  #[test]
  fn new_book_starts_available() {
    assert_eq!(Availability::of(&book()), Availability::Available);
  }

  #[test]
  fn check_out_then_check_in() {
    let mut b = book();
    check_out(&mut b).unwrap();
    assert!(!b.available);
    check_in(&mut b).unwrap();
    assert!(b.available);
  }

  #[test]
  fn double_check_out_is_rejected() {
    let mut b = book();
    check_out(&mut b).unwrap();
    let err = check_out(&mut b).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition {
        state: Availability::CheckedOut,
        action: CheckoutAction::CheckOut,
        ..
      }
    ));
    assert!(!b.available);
  }

  #[test]
  fn check_in_of_available_book_is_rejected() {
    let mut b = book();
    let before = b.clone();
    let err = check_in(&mut b).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    assert_eq!(b, before);
  }

  #[test]
  fn discriminants_match_serde_tags() {
    for action in [CheckoutAction::CheckOut, CheckoutAction::CheckIn] {
      let json = serde_json::to_value(action).unwrap();
      assert_eq!(json, serde_json::json!(action.discriminant()));
      assert_eq!(CheckoutAction::from_discriminant(action.discriminant()), Some(action));
    }
    assert_eq!(CheckoutAction::from_discriminant("returned"), None);
  }
}
