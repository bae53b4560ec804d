//! The `BoardStore` trait and its SQLite and in-memory implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use plank_types::Board;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OpenFlags, OptionalExtension};
use thiserror::Error;

use crate::migrations::{run_migrations, MigrationError};

/// Errors that can occur during board persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No board with the given document id exists.
    #[error("board {0} not found")]
    NotFound(u64),

    /// An underlying SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection pool could not provide a connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The board document could not be (de)serialized.
    #[error("board document serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema migrations failed while opening the store.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Persistence interface consumed by the document service.
///
/// The service calls [`save`](BoardStore::save) after each successful patch
/// commit; it never retries a failed save on its own.
pub trait BoardStore: Send + Sync {
    /// Persists a new board, assigning its document id.
    fn create(&self, board: Board) -> Result<Board, StoreError>;

    /// Loads a board by document id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such board exists.
    fn load(&self, board_id: u64) -> Result<Board, StoreError>;

    /// Saves the current state of an existing board.
    fn save(&self, board: &Board) -> Result<(), StoreError>;
}

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// SQLite-backed board store.
///
/// Each board is one row in the `boards` table: the rowid is the document
/// id and the full board serializes into the `document` JSON column.
pub struct SqliteStore {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at `db_path`, configures
    /// WAL mode on every pooled connection, and runs pending migrations.
    ///
    /// Use `:memory:` as the path for an in-memory database (useful for
    /// testing; note each pooled connection then sees its own database, so
    /// tests should also cap `pool_max_size` at 1).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the pool cannot be created or migrations
    /// fail.
    pub fn open(db_path: &str, settings: DbRuntimeSettings) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(flags)
            .with_init(move |conn| {
                // Set WAL mode and verify it was accepted. In-memory
                // databases report "memory" which is expected and acceptable.
                let journal_mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
                if journal_mode != "wal" && journal_mode != "memory" {
                    return Err(rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                        Some(format!(
                            "failed to set WAL journal mode, got: {}",
                            journal_mode
                        )),
                    ));
                }
                conn.execute_batch(&format!(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = {};",
                    settings.busy_timeout_ms
                ))
            });

        let pool = r2d2::Pool::builder()
            .max_size(settings.pool_max_size)
            .build(manager)?;

        {
            let conn = pool.get()?;
            run_migrations(&conn)?;
        }

        Ok(Self { pool })
    }
}

impl BoardStore for SqliteStore {
    fn create(&self, mut board: Board) -> Result<Board, StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        // Insert first to obtain the rowid, then write the document with
        // the assigned id baked in.
        tx.execute(
            "INSERT INTO boards (title, document) VALUES (?1, '{}')",
            params![board.title],
        )?;
        board.id = tx.last_insert_rowid() as u64;

        let document = serde_json::to_string(&board)?;
        tx.execute(
            "UPDATE boards SET document = ?1 WHERE id = ?2",
            params![document, board.id as i64],
        )?;
        tx.commit()?;
        Ok(board)
    }

    fn load(&self, board_id: u64) -> Result<Board, StoreError> {
        let conn = self.pool.get()?;
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM boards WHERE id = ?1",
                params![board_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        let document = document.ok_or(StoreError::NotFound(board_id))?;
        Ok(serde_json::from_str(&document)?)
    }

    fn save(&self, board: &Board) -> Result<(), StoreError> {
        let document = serde_json::to_string(board)?;
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE boards SET title = ?1, document = ?2, updated_at = datetime('now')
             WHERE id = ?3",
            params![board.title, document, board.id as i64],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(board.id));
        }
        Ok(())
    }
}

/// In-memory board store for tests and ephemeral deployments.
///
/// Boards round-trip through their JSON form so the store exercises the
/// same serialization path as [`SqliteStore`].
pub struct MemoryStore {
    boards: Mutex<HashMap<u64, String>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            boards: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardStore for MemoryStore {
    fn create(&self, mut board: Board) -> Result<Board, StoreError> {
        board.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let document = serde_json::to_string(&board)?;
        self.boards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(board.id, document);
        Ok(board)
    }

    fn load(&self, board_id: u64) -> Result<Board, StoreError> {
        let boards = self
            .boards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let document = boards.get(&board_id).ok_or(StoreError::NotFound(board_id))?;
        Ok(serde_json::from_str(document)?)
    }

    fn save(&self, board: &Board) -> Result<(), StoreError> {
        let document = serde_json::to_string(board)?;
        let mut boards = self
            .boards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match boards.get_mut(&board.id) {
            Some(slot) => {
                *slot = document;
                Ok(())
            }
            None => Err(StoreError::NotFound(board.id)),
        }
    }
}
