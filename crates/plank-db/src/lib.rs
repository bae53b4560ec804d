//! Persistence layer for the plank board platform.
//!
//! Provides the [`BoardStore`] trait the document service consumes, a
//! SQLite-backed implementation with connection pooling (via `r2d2`),
//! WAL-mode initialization and embedded SQL migrations, and an in-memory
//! implementation for tests.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process required. WAL
//!   allows concurrent readers with a single writer, which matches the
//!   one-writer-per-board access pattern of the patch path.
//! - **Whole-document rows**: a board document is stored as one JSON column
//!   keyed by its rowid. The patch path always saves a complete board, so a
//!   normalized schema would only add write amplification.
//! - **Rowid document ids**: `AUTOINCREMENT` ids start at 1, so the reserved
//!   0 sentinel is structurally never assigned to a real board.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, ensuring migrations ship with the server and cannot
//!   drift from the code that depends on them.

mod migrations;
mod store;

pub use migrations::{run_migrations, MigrationError};
pub use store::{BoardStore, DbRuntimeSettings, MemoryStore, SqliteStore, StoreError};
