//! Document service: per-board patch serialization, persistence, and
//! broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use plank_board::{BoardPatcher, PatchError};
use plank_db::{BoardStore, StoreError};
use plank_events::BoardEvent;
use plank_types::Board;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::broker::Broker;

/// Errors surfaced by the document service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The mutator aborted; no state changed.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Loading or saving the board failed. A failed save after a committed
    /// patch is surfaced to the caller and not retried; nothing is
    /// broadcast for that patch.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Binds the entity tree, the persistence interface, and the broker.
///
/// Each open board lives behind its own `tokio::sync::Mutex`, so patches to
/// one board are serialized relative to each other while independent boards
/// are mutated fully in parallel.
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn BoardStore>,
    broker: Broker,
    open: Arc<RwLock<HashMap<u64, Arc<Mutex<Board>>>>>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn BoardStore>, broker: Broker) -> Self {
        Self {
            store,
            broker,
            open: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The broker this service broadcasts through.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Creates and persists a new board; the store assigns its document id.
    pub async fn create_board(&self, title: &str) -> Result<Board, ServiceError> {
        let store = self.store.clone();
        let board = Board::new(title);
        let board = tokio::task::spawn_blocking(move || store.create(board)).await??;
        tracing::info!(board_id = board.id, title = %board.title, "created board");

        let mut open = self.open.write().await;
        open.insert(board.id, Arc::new(Mutex::new(board.clone())));
        Ok(board)
    }

    /// Read-only snapshot of a board, loading it on first touch.
    pub async fn board(&self, board_id: u64) -> Result<Board, ServiceError> {
        let entry = self.entry(board_id).await?;
        let board = entry.lock().await;
        Ok(board.clone())
    }

    /// Applies a patch to one board: runs the mutator atomically, saves the
    /// committed state, then broadcasts the resulting events in operation
    /// order.
    ///
    /// The board's mutex is held across save and broadcast, so subscribers
    /// observe events in exactly the order patches committed. Broadcast
    /// uses non-blocking delivery and the save runs on the blocking pool,
    /// so the lock is never held across network I/O.
    pub async fn patch<F>(&self, board_id: u64, mutate: F) -> Result<Vec<BoardEvent>, ServiceError>
    where
        F: FnOnce(&mut BoardPatcher) -> Result<(), PatchError>,
    {
        let entry = self.entry(board_id).await?;
        let mut board = entry.lock().await;

        let events = plank_board::patch(&mut board, mutate)?;

        let snapshot = board.clone();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&snapshot)).await??;

        for event in &events {
            match plank_events::encode(event) {
                Ok(payload) => self.broker.broadcast(board_id, payload).await,
                Err(e) => {
                    tracing::error!(
                        board_id,
                        event = event.kind(),
                        "failed to serialize event for broadcast: {}",
                        e
                    );
                }
            }
        }
        Ok(events)
    }

    /// Returns the open entry for a board, loading it from the store on
    /// first touch.
    async fn entry(&self, board_id: u64) -> Result<Arc<Mutex<Board>>, ServiceError> {
        {
            let open = self.open.read().await;
            if let Some(entry) = open.get(&board_id) {
                return Ok(entry.clone());
            }
        }

        let store = self.store.clone();
        let board = tokio::task::spawn_blocking(move || store.load(board_id)).await??;

        // Double-check under the write lock: a concurrent load may have won
        // the race, and its entry (possibly already patched) must not be
        // clobbered with our stale copy.
        let mut open = self.open.write().await;
        Ok(open
            .entry(board_id)
            .or_insert_with(|| Arc::new(Mutex::new(board)))
            .clone())
    }
}
