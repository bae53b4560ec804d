//! Ordered entity tree mutation for the plank board platform.
//!
//! All mutation of a board document happens through a single entry point,
//! [`patch`]: the caller passes a mutator closure, the closure receives a
//! [`BoardPatcher`] capability object bound to that board, and performs one
//! or more structural operations before returning. The patch call is the
//! unit of atomicity — either every operation inside one call takes effect
//! and the board's observable state is updated exactly once, or none do.
//!
//! Funneling every mutation through one patcher keeps invariant enforcement
//! (id uniqueness, cascade deletes, legal ordering) centralized, and maps
//! every mutation 1:1 to an outbound [`plank_events::BoardEvent`].
//!
//! # Example
//!
//! ```
//! use plank_board::patch;
//! use plank_types::{Board, Card, CardList};
//!
//! let mut board = Board::new("Roadmap");
//! board.id = 1;
//!
//! let events = patch(&mut board, |p| {
//!     let list_id = p.add_list(CardList::new("Backlog"))?;
//!     p.list(list_id)?.add_card(Card::new("Write the proposal"))?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(events.len(), 2);
//! assert_eq!(board.lists[0].cards[0].id, 1);
//! ```

mod error;
mod patch;

pub use error::PatchError;
pub use patch::{patch, BoardPatcher, CardPatcher, ListPatcher};
