//! Error types for `shelf-core`.

use thiserror::Error;

use crate::{
  book::BookId,
  checkout::{Availability, CheckoutAction},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("book not found: {0}")]
  NotFound(BookId),

  #[error("cannot {action} book {book_id}: it is {state}")]
  InvalidTransition {
    book_id: BookId,
    state:   Availability,
    action:  CheckoutAction,
  },

  /// A book store or ledger operation failed. Never retried here.
  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a collaborator error as [`Error::Storage`].
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }

  /// Short name of the failure kind, suitable for one-line reports.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::NotFound(_) => "not found",
      Self::InvalidTransition { .. } => "invalid transition",
      Self::Storage(_) => "storage failure",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
