//! Webcomic reader core: fetch comics and the archive listing from a comic
//! site, keep bookmarks, and run each fetch as a cancellable background task.
//!
//! ```text
//! ComicViewer → Task (worker thread) → ComicProvider → Transport
//!             ↘ ArchiveCache (TTL) ↗            ↘ Database (bookmarks)
//! ```

pub mod archive;
pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod share;
pub mod transport;
pub mod viewer;
pub mod xkcd;

pub use error::{ComicError, ErrorKind};
pub use models::{ArchiveEntry, ComicRecord, ComicRef};
