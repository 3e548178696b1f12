//! Console state and command dispatcher.

use std::str::FromStr;

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use shelf_core::{
  book::{Book, BookDetails, NewBook},
  coordinator::{CheckoutCoordinator, Consistency},
  store::{BookStore, CheckoutLedger},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

const HELP: &str = "
Commands:

Books:
  add           (addBook)
  ls            (getAllRecords)
  find          (findByName)
  search
  update        (updateBook)
  delete        (deleteBook)

Checkout:
  checkout      (checkOut)
  checkin       (checkIn)
  status
  history       (viewHistory)
  history-all   (viewAllHistory, vah)

Other:
  help
  exit
";

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Add,
  List,
  Find,
  Search,
  Update,
  Delete,
  CheckOut,
  CheckIn,
  Status,
  History,
  HistoryAll,
  Help,
  Exit,
}

impl FromStr for Command {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "add" | "addBook" => Self::Add,
      "ls" | "getAllRecords" => Self::List,
      "find" | "findByName" => Self::Find,
      "search" => Self::Search,
      "update" | "updateBook" => Self::Update,
      "delete" | "deleteBook" => Self::Delete,
      "checkout" | "checkOut" => Self::CheckOut,
      "checkin" | "checkIn" => Self::CheckIn,
      "status" => Self::Status,
      "history" | "viewHistory" => Self::History,
      "history-all" | "viewAllHistory" | "vah" => Self::HistoryAll,
      "help" => Self::Help,
      "exit" | "quit" => Self::Exit,
      _ => return Err(()),
    })
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level console state: a coordinator over one store, plus the line
/// reader and writer the operator talks through.
pub struct App<S, R, W> {
  coordinator: CheckoutCoordinator<S, S>,
  input:       Lines<R>,
  out:         W,
}

impl<S, R, W> App<S, R, W>
where
  S: BookStore + CheckoutLedger + Clone,
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  pub fn new(store: S, input: R, out: W) -> Self {
    Self {
      coordinator: CheckoutCoordinator::new(store.clone(), store),
      input: input.lines(),
      out,
    }
  }

  /// Consume the app and return its writer.
  #[cfg(test)]
  pub fn into_output(self) -> W { self.out }

  /// Read and execute commands until `exit` or end of input.
  pub async fn run(&mut self) -> anyhow::Result<()> {
    self
      .say("Welcome to the book app! Type 'help' for a list of commands.")
      .await?;
    loop {
      let Some(line) = self.prompt(">>> ").await? else {
        break;
      };
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      if !self.handle_command(line).await? {
        break;
      }
    }
    self.say("Goodbye!").await?;
    Ok(())
  }

  /// Execute one command line. Returns `true` to continue, `false` to quit.
  ///
  /// Store and checkout failures are reported and the loop continues; only
  /// console I/O errors propagate.
  pub async fn handle_command(&mut self, line: &str) -> anyhow::Result<bool> {
    let Ok(cmd) = line.parse::<Command>() else {
      self
        .say("Invalid command. Type 'help' to see available commands.")
        .await?;
      return Ok(true);
    };
    tracing::debug!(?cmd, "dispatching");

    match cmd {
      Command::Exit => return Ok(false),
      Command::Help => self.say(HELP).await?,
      Command::Add => self.add_book().await?,
      Command::List => self.list_books().await?,
      Command::Find => self.find_books().await?,
      Command::Search => self.search_books().await?,
      Command::Update => self.update_book().await?,
      Command::Delete => self.delete_book().await?,
      Command::CheckOut => self.check_out().await?,
      Command::CheckIn => self.check_in().await?,
      Command::Status => self.status().await?,
      Command::History => self.history().await?,
      Command::HistoryAll => self.history_all().await?,
    }
    Ok(true)
  }

  // ── I/O helpers ───────────────────────────────────────────────────────────

  async fn say(&mut self, msg: impl AsRef<str>) -> anyhow::Result<()> {
    self.out.write_all(msg.as_ref().as_bytes()).await?;
    self.out.write_all(b"\n").await?;
    self.out.flush().await?;
    Ok(())
  }

  /// Print `label` without a newline and read one line. `None` at end of
  /// input.
  async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
    self.out.write_all(label.as_bytes()).await?;
    self.out.flush().await?;
    Ok(self.input.next_line().await?.map(|l| l.trim().to_owned()))
  }

  /// Ask each label in turn. `None` if input ends before every answer is in.
  async fn prompt_all<T: AsRef<str>, const N: usize>(
    &mut self,
    labels: [T; N],
  ) -> anyhow::Result<Option<[String; N]>> {
    let mut answers = Vec::with_capacity(N);
    for label in &labels {
      let Some(answer) = self.prompt(label.as_ref()).await? else {
        return Ok(None);
      };
      answers.push(answer);
    }
    Ok(answers.try_into().ok())
  }

  async fn say_books(&mut self, heading: &str, books: &[Book]) -> anyhow::Result<()> {
    if books.is_empty() {
      return self.say("No books found.").await;
    }
    self.say(format!("\n--- {heading} ---")).await?;
    for book in books {
      self.say(book.to_string()).await?;
    }
    Ok(())
  }

  /// Ask for a title and resolve it to one book, asking the operator to pick
  /// when several share the title.
  async fn select_book_by_title(&mut self, action: &str) -> anyhow::Result<Option<Book>> {
    let Some(title) = self.prompt(&format!("Enter book title to {action}: ")).await? else {
      return Ok(None);
    };

    let mut matches = match self.coordinator.books().find_books_by_title(&title).await {
      Ok(m) => m,
      Err(e) => {
        self.say(format!("Error: {e}")).await?;
        return Ok(None);
      }
    };

    match matches.len() {
      0 => {
        self.say("No books found.").await?;
        Ok(None)
      }
      1 => Ok(matches.pop()),
      _ => {
        self.say("\nMultiple books found:").await?;
        for (i, book) in matches.iter().enumerate() {
          self
            .say(format!("[{}] {} | {} | ID: {}", i + 1, book.title, book.author, book.book_id))
            .await?;
        }
        let choice = self.prompt("Select number: ").await?.unwrap_or_default();
        match choice.parse::<usize>() {
          Ok(n) if (1..=matches.len()).contains(&n) => Ok(Some(matches.swap_remove(n - 1))),
          _ => {
            self.say("Invalid selection.").await?;
            Ok(None)
          }
        }
      }
    }
  }

  // ── Books ─────────────────────────────────────────────────────────────────

  async fn list_books(&mut self) -> anyhow::Result<()> {
    match self.coordinator.books().get_all_books().await {
      Ok(books) => self.say_books("Books", &books).await,
      Err(e) => self.say(format!("Error: {e}")).await,
    }
  }

  async fn find_books(&mut self) -> anyhow::Result<()> {
    let title = self.prompt("Enter book name: ").await?.unwrap_or_default();
    match self.coordinator.books().find_books_by_title(&title).await {
      Ok(books) => self.say_books("Matches", &books).await,
      Err(e) => self.say(format!("Error: {e}")).await,
    }
  }

  /// Fuzzy title/author search, best match first.
  async fn search_books(&mut self) -> anyhow::Result<()> {
    let query = self.prompt("Search: ").await?.unwrap_or_default();
    let books = match self.coordinator.books().get_all_books().await {
      Ok(b) => b,
      Err(e) => return self.say(format!("Error: {e}")).await,
    };

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, Book)> = books
      .into_iter()
      .filter_map(|b| {
        let haystack = format!("{} {}", b.title, b.author);
        matcher.fuzzy_match(&haystack, &query).map(|score| (score, b))
      })
      .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let found: Vec<Book> = scored.into_iter().map(|(_, b)| b).collect();
    self.say_books("Matches", &found).await
  }

  async fn add_book(&mut self) -> anyhow::Result<()> {
    self.say("Enter Book Details").await?;
    let Some([title, author, genre, page_count, publisher, price_usd, in_print]) = self
      .prompt_all([
        "Title: ",
        "Author: ",
        "Genre: ",
        "Page Count: ",
        "Publisher: ",
        "Price USD: ",
        "In Print (True/False): ",
      ])
      .await?
    else {
      return Ok(());
    };

    if title.is_empty() {
      return self.say("Error: title is required").await;
    }

    let details = match (
      parse_optional::<u32>(&page_count),
      parse_optional::<f64>(&price_usd),
      parse_optional_bool(&in_print),
    ) {
      (Ok(page_count), Ok(price_usd), Ok(in_print)) => BookDetails {
        genre: non_empty(genre),
        page_count,
        publisher: non_empty(publisher),
        price_usd,
        in_print,
        ..BookDetails::default()
      },
      _ => return self.say("Error: invalid number or True/False value").await,
    };

    let mut input = NewBook::new(title, author);
    input.details = details;
    match self.coordinator.books().add_book(input).await {
      Ok(book) => self.say(format!("Book added with ID: {}", book.book_id)).await,
      Err(e) => self.say(format!("Error: {e}")).await,
    }
  }

  /// Edit catalog fields through the coordinator, which applies the answers
  /// to the record as it is under the book's lock. Availability is owned by
  /// checkout and is never changed here.
  async fn update_book(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("update").await? else {
      return Ok(());
    };

    self.say("Leave blank to keep existing value.").await?;
    let Some([title, author, genre, rating, price, publisher, in_print]) = self
      .prompt_all([
        format!("New title [{}]: ", book.title),
        format!("New author [{}]: ", book.author),
        format!("New genre [{}]: ", show(&book.details.genre)),
        format!("New average rating [{}]: ", show(&book.details.average_rating)),
        format!("New price USD [{}]: ", show(&book.details.price_usd)),
        format!("New publisher [{}]: ", show(&book.details.publisher)),
        format!("Is in print (True/False) [{}]: ", show(&book.details.in_print)),
      ])
      .await?
    else {
      return Ok(());
    };

    let (Ok(rating), Ok(price), Ok(in_print)) = (
      parse_optional::<f64>(&rating),
      parse_optional::<f64>(&price),
      parse_optional_bool(&in_print),
    ) else {
      return self.say("Error: invalid number or True/False value").await;
    };
    let (title, author, genre, publisher) =
      (non_empty(title), non_empty(author), non_empty(genre), non_empty(publisher));

    let edit = move |book: &mut Book| {
      if let Some(t) = title {
        book.title = t;
      }
      if let Some(a) = author {
        book.author = a;
      }
      if genre.is_some() {
        book.details.genre = genre;
      }
      if publisher.is_some() {
        book.details.publisher = publisher;
      }
      book.details.average_rating = rating.or(book.details.average_rating);
      book.details.price_usd = price.or(book.details.price_usd);
      book.details.in_print = in_print.or(book.details.in_print);
    };

    match self.coordinator.edit_catalog(&book.book_id, edit).await {
      Ok(_) => self.say("Book updated successfully.").await,
      Err(e) => self.say(format!("Update failed: {} ({e})", e.kind())).await,
    }
  }

  async fn delete_book(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("delete").await? else {
      return Ok(());
    };
    match self.coordinator.books().delete_book(&book.book_id).await {
      Ok(true) => self.say("Book deleted successfully.").await,
      Ok(false) => self.say("Delete failed.").await,
      Err(e) => self.say(format!("Delete failed: {e}")).await,
    }
  }

  // ── Checkout ──────────────────────────────────────────────────────────────

  async fn check_out(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("check out").await? else {
      return Ok(());
    };
    match self.coordinator.check_out(&book.book_id).await {
      Ok(_) => self.say(format!("Book '{}' checked out.", book.title)).await,
      Err(e) => self.say(format!("Check-out failed: {} ({e})", e.kind())).await,
    }
  }

  async fn check_in(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("check in").await? else {
      return Ok(());
    };
    match self.coordinator.check_in(&book.book_id).await {
      Ok(_) => self.say(format!("Book '{}' checked in.", book.title)).await,
      Err(e) => self.say(format!("Check-in failed: {} ({e})", e.kind())).await,
    }
  }

  async fn status(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("show status for").await? else {
      return Ok(());
    };
    let status = match self.coordinator.status(&book.book_id).await {
      Ok(s) => s,
      Err(e) => return self.say(format!("Status failed: {} ({e})", e.kind())).await,
    };

    self.say(format!("'{}' is {}.", status.book.title, status.availability)).await?;
    match status.last_returned {
      Some(at) => self.say(format!("Last returned at {}", at.to_rfc3339())).await?,
      None => self.say("Never returned.").await?,
    }
    if let Consistency::Diverged { available, latest } = status.consistency {
      let latest = latest.map_or_else(|| "none".to_owned(), |a| a.to_string());
      self
        .say(format!(
          "Warning: record says available={available} but last ledger event is {latest}."
        ))
        .await?;
    }
    Ok(())
  }

  async fn history(&mut self) -> anyhow::Result<()> {
    let Some(book) = self.select_book_by_title("view history for").await? else {
      return Ok(());
    };
    let events = match self.coordinator.history_for_book(&book.book_id).await {
      Ok(ev) => ev,
      Err(e) => return self.say(format!("Error: {e}")).await,
    };
    if events.is_empty() {
      return self.say("No history found.").await;
    }
    self.say(format!("\n--- History for '{}' ---", book.title)).await?;
    for event in &events {
      self.say(event.to_string()).await?;
    }
    Ok(())
  }

  async fn history_all(&mut self) -> anyhow::Result<()> {
    let events = match self.coordinator.history_all().await {
      Ok(ev) => ev,
      Err(e) => return self.say(format!("Error: {e}")).await,
    };
    if events.is_empty() {
      return self.say("No checkout history found.").await;
    }
    self.say("\n--- All Checkout History ---").await?;
    for event in &events {
      self.say(format!("Book ID {}: {event}", event.book_id)).await?;
    }
    Ok(())
  }
}

// ─── Input parsing ────────────────────────────────────────────────────────────

fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

/// Blank input means "no value".
fn parse_optional<T: FromStr>(s: &str) -> Result<Option<T>, T::Err> {
  if s.is_empty() { Ok(None) } else { s.parse().map(Some) }
}

fn parse_optional_bool(s: &str) -> Result<Option<bool>, ()> {
  match s.to_ascii_lowercase().as_str() {
    "" => Ok(None),
    "true" | "yes" | "y" => Ok(Some(true)),
    "false" | "no" | "n" => Ok(Some(false)),
    _ => Err(()),
  }
}

fn show<T: std::fmt::Display>(v: &Option<T>) -> String {
  v.as_ref().map_or_else(|| "None".to_owned(), T::to_string)
}
