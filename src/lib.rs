//! # TeaRank
//!
//! Merges packages from many package managers into canons keyed by their
//! homepage, builds the canon dependency graph and ranks every canon by
//! distributing personalized weight along its dependencies. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! tearank = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use tokio_util::sync::CancellationToken;
//! use tearank::config::Config;
//! use tearank::dedupe::ScoredNamer;
//! use tearank::store::{SqliteStore, Store};
//!
//! let config = Config::load("./data", None)?;
//! let store = SqliteStore::new(config.db_path())?;
//! store.initialize()?;
//!
//! let report = tearank::pipeline::run(
//!     &store,
//!     &config,
//!     &ScoredNamer,
//!     &CancellationToken::new(),
//!     Utc::now(),
//!     false,
//! )?;
//! println!("run {} ranked {} canons", report.rank.run, report.rank.canons);
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod rank;
pub mod snapshot;
pub mod store;
pub mod types;
