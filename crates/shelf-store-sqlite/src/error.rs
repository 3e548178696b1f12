//! Error type for `shelf-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A ledger row carries an action this build does not know.
  #[error("unknown checkout action: {0:?}")]
  UnknownAction(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
