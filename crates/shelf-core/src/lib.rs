//! Core types and trait definitions for the Shelf library catalog.
//!
//! This crate is deliberately free of database and terminal dependencies.
//! Storage backends implement the traits in [`store`]; the console and any
//! other front end drive checkouts through [`coordinator`].

pub mod book;
pub mod checkout;
pub mod coordinator;
pub mod error;
pub mod store;

pub use error::{Error, Result};
