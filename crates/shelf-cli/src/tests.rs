//! Console tests driven through in-memory readers and writers.

use shelf_core::{
  book::NewBook,
  checkout::CheckoutAction,
  coordinator::CheckoutCoordinator,
  store::{BookStore, CheckoutLedger},
};
use shelf_store_sqlite::SqliteStore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, duplex};

use crate::app::App;

async fn store_with(books: &[(&str, &str)]) -> SqliteStore {
  let store = SqliteStore::open_in_memory().await.unwrap();
  for (id, title) in books {
    store
      .add_book(NewBook::new(*title, "Anon").with_id(*id))
      .await
      .unwrap();
  }
  store
}

/// Run a full session over `script` and return everything printed.
async fn session(store: &SqliteStore, script: &str) -> String {
  let mut app = App::new(store.clone(), BufReader::new(script.as_bytes()), Vec::new());
  app.run().await.unwrap();
  String::from_utf8(app.into_output()).unwrap()
}

/// Read from `reader` until the accumulated output contains `needle`.
async fn read_until(reader: &mut (impl AsyncRead + Unpin), seen: &mut String, needle: &str) {
  let mut buf = [0u8; 1024];
  while !seen.contains(needle) {
    let n = reader.read(&mut buf).await.unwrap();
    assert!(n > 0, "output ended before {needle:?}; got {seen:?}");
    seen.push_str(&String::from_utf8_lossy(&buf[..n]));
  }
}

#[tokio::test]
async fn check_out_and_in_through_console() {
  let store = store_with(&[("b1", "Dune")]).await;

  let out = session(
    &store,
    "checkout\nDune\ncheckout\nDune\ncheckin\nDune\nhistory\nDune\nexit\n",
  )
  .await;

  assert!(out.contains("Book 'Dune' checked out."));
  assert!(out.contains("Check-out failed: invalid transition"));
  assert!(out.contains("Book 'Dune' checked in."));
  assert!(out.contains("--- History for 'Dune' ---"));
  assert!(out.trim_end().ends_with("Goodbye!"));

  let history = store.history_for(&"b1".into()).await.unwrap();
  let actions: Vec<_> = history.iter().map(|e| e.action).collect();
  assert_eq!(actions, vec![CheckoutAction::CheckOut, CheckoutAction::CheckIn]);
}

#[tokio::test]
async fn duplicate_titles_prompt_for_selection() {
  let store = store_with(&[("b1", "Dune"), ("b2", "Dune")]).await;

  let out = session(&store, "checkout\nDune\n2\n").await;

  assert!(out.contains("Multiple books found:"));
  assert!(out.contains("ID: b2"));
  let books = store.get_all_books().await.unwrap();
  assert!(books[0].available);
  assert!(!books[1].available);
}

#[tokio::test]
async fn invalid_selection_changes_nothing() {
  let store = store_with(&[("b1", "Dune"), ("b2", "Dune")]).await;

  let out = session(&store, "checkout\nDune\n7\n").await;

  assert!(out.contains("Invalid selection."));
  assert!(store.history_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_then_list() {
  let store = store_with(&[]).await;

  let out = session(
    &store,
    "addBook\nEmma\nJane Austen\nRomance\n474\nJohn Murray\n12.50\ntrue\nls\n",
  )
  .await;

  assert!(out.contains("Book added with ID: "));
  let books = store.get_all_books().await.unwrap();
  assert_eq!(books.len(), 1);
  assert_eq!(books[0].details.page_count, Some(474));
  assert_eq!(books[0].details.in_print, Some(true));
  assert!(out.contains("Emma | Jane Austen | available"));
}

#[tokio::test]
async fn add_rejects_bad_numbers() {
  let store = store_with(&[]).await;

  let out = session(&store, "add\nEmma\nJane Austen\n\nmany\n\n\n\n").await;

  assert!(out.contains("Error: invalid number"));
  assert!(store.get_all_books().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_keeps_availability() {
  let store = store_with(&[("b1", "Dune")]).await;

  session(&store, "checkout\nDune\nupdate\nDune\nDune Messiah\n\n\n4.5\n\n\n\n").await;

  let book = store.get_all_books().await.unwrap().remove(0);
  assert_eq!(book.title, "Dune Messiah");
  assert_eq!(book.details.average_rating, Some(4.5));
  assert!(!book.available);
}

#[tokio::test]
async fn update_does_not_revert_concurrent_checkout() {
  let store = store_with(&[("b1", "Dune")]).await;
  let desk = CheckoutCoordinator::new(store.clone(), store.clone());

  let (mut to_app, app_in) = duplex(4096);
  let (app_out, mut from_app) = duplex(64 * 1024);
  let mut app = App::new(store.clone(), BufReader::new(app_in), app_out);

  let operator = async {
    let mut seen = String::new();
    to_app.write_all(b"update\nDune\n").await.unwrap();
    read_until(&mut from_app, &mut seen, "New title [").await;

    // Another desk lends the book while the operator is still typing.
    desk.check_out(&"b1".into()).await.unwrap();

    to_app
      .write_all(b"Dune Messiah\n\n\n\n\n\n\nexit\n")
      .await
      .unwrap();
    read_until(&mut from_app, &mut seen, "Goodbye!").await;
    seen
  };

  let (run, out) = tokio::join!(app.run(), operator);
  run.unwrap();

  assert!(out.contains("Book updated successfully."));
  let book = store.get_all_books().await.unwrap().remove(0);
  assert_eq!(book.title, "Dune Messiah");
  assert!(!book.available);
  assert!(book.last_checkout.is_some());
  assert_eq!(
    store.latest_action_for(&"b1".into()).await.unwrap(),
    Some(CheckoutAction::CheckOut)
  );
  assert!(desk.reconcile(&"b1".into()).await.unwrap().is_consistent());
}

#[tokio::test]
async fn add_stops_at_end_of_input() {
  let store = store_with(&[]).await;

  let out = session(&store, "add\nEmma\nJane Austen\n").await;

  assert!(!out.contains("Book added"));
  assert!(store.get_all_books().await.unwrap().is_empty());
  assert!(out.trim_end().ends_with("Goodbye!"));
}

#[tokio::test]
async fn update_stops_at_end_of_input() {
  let store = store_with(&[("b1", "Dune")]).await;

  let out = session(&store, "update\nDune\nDune Messiah\n").await;

  assert!(!out.contains("Book updated"));
  assert_eq!(store.get_all_books().await.unwrap()[0].title, "Dune");
}

#[tokio::test]
async fn status_and_history_all() {
  let store = store_with(&[("b1", "Dune"), ("b2", "Emma")]).await;

  let out = session(
    &store,
    "checkout\nDune\ncheckin\nDune\ncheckout\nEmma\nstatus\nDune\nvah\n",
  )
  .await;

  assert!(out.contains("'Dune' is available."));
  assert!(out.contains("Last returned at "));
  assert!(!out.contains("Warning:"));
  assert!(out.contains("Book ID b1: Checked out at "));
  assert!(out.contains("Book ID b1: Returned at "));
  assert!(out.contains("Book ID b2: Checked out at "));
}

#[tokio::test]
async fn search_is_fuzzy() {
  let store = store_with(&[("b1", "Dune"), ("b2", "Emma")]).await;

  let out = session(&store, "search\ndne\n").await;

  assert!(out.contains("Dune | Anon"));
  assert!(!out.contains("Emma | Anon"));
}

#[tokio::test]
async fn unknown_command_and_missing_book() {
  let store = store_with(&[]).await;

  let out = session(&store, "frobnicate\ncheckin\nNothing\nhistory-all\n").await;

  assert!(out.contains("Invalid command."));
  assert!(out.contains("No books found."));
  assert!(out.contains("No checkout history found."));
}

#[tokio::test]
async fn delete_book() {
  let store = store_with(&[("b1", "Dune")]).await;

  let out = session(&store, "deleteBook\nDune\nfind\nDune\n").await;

  assert!(out.contains("Book deleted successfully."));
  assert!(store.get_all_books().await.unwrap().is_empty());
}
