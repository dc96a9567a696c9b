//! YaMDb CSV importer
//!
//! Loads the fixture files (`category.csv`, `genre.csv`, `users.csv`,
//! `titles.csv`, `review.csv`, `comments.csv`, `genre_title.csv`) into the
//! database inside a single transaction.

pub mod errors;
pub mod loader;
pub mod records;

pub use errors::{ImportError, Result};
pub use loader::{import, import_files, Fixture, ImportReport};
