//! `shelf` — interactive console for the Shelf library catalog.
//!
//! # Usage
//!
//! ```
//! shelf --store ~/.local/share/shelf/shelf.db
//! shelf --config ~/.config/shelf/config.toml
//! shelf --in-memory
//! ```

mod app;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use serde::Deserialize;
use shelf_store_sqlite::SqliteStore;
use tokio::io::{BufReader, stdin, stdout};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "shelf", version, about = "Interactive console for the Shelf library catalog")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "shelf.toml")]
  config: PathBuf,

  /// SQLite database holding books and checkout history.
  #[arg(long, env = "SHELF_STORE")]
  store: Option<PathBuf>,

  /// Use a throwaway in-memory database.
  #[arg(long, conflicts_with = "store")]
  in_memory: bool,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Settings read from the config file and `SHELF_*` environment variables.
#[derive(Deserialize, Debug)]
struct ConsoleConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("shelf.db") }

fn load_config(path: &Path) -> Result<ConsoleConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("SHELF"))
    .build()
    .with_context(|| format!("failed to read config file {}", path.display()))?;

  settings
    .try_deserialize()
    .context("failed to deserialise ConsoleConfig")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so they never interleave with console output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let store = if args.in_memory {
    SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store")?
  } else {
    // CLI flags override config file and environment.
    let store_path = match args.store {
      Some(p) => p,
      None => load_config(&args.config)?.store_path,
    };
    let store_path = expand_tilde(&store_path);
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?
  };

  let mut app = App::new(store, BufReader::new(stdin()), stdout());
  app.run().await
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests;
