//! Shared entity definitions for the plank board platform.
//!
//! This crate provides the hierarchical document model used across all plank
//! crates: a [`Board`] owns ordered [`CardList`]s, each list owns ordered
//! [`Card`]s, and each card owns [`Subtask`]s and references [`Tag`]s defined
//! on the board. Ownership is strictly hierarchical and non-cyclic;
//! back-references (`board_id`, `list_id`, `card_id`) are plain lookup keys,
//! never owning links.
//!
//! No crate in the workspace depends on anything *except* `plank-types` for
//! the entity model. This keeps the dependency graph clean and prevents
//! circular dependencies.
//!
//! # Id conventions
//!
//! Entity ids are 64-bit unsigned integers assigned per entity kind from
//! monotonic counters carried on the owning board ([`IdCounters`]). Id 0
//! ([`NIL_ID`]) is reserved as a sentinel — "no entity", "head of sequence"
//! or "no default preset" depending on context — and is never assigned to a
//! real entity. Entities are constructed with id 0 and receive a real id the
//! moment they are first inserted into a parent's sequence.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The reserved sentinel id. Never assigned to a real entity.
pub const NIL_ID: u64 = 0;

/// The kinds of entities that make up a board document.
///
/// Every id-bearing operation and error names its kind, since id namespaces
/// are per kind (a list and a card may both carry id 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Board,
    CardList,
    Card,
    Subtask,
    Tag,
    ColorPreset,
}

impl EntityKind {
    /// Returns the canonical lowercase label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::CardList => "card list",
            Self::Card => "card",
            Self::Subtask => "subtask",
            Self::Tag => "tag",
            Self::ColorPreset => "color preset",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind id counters carried (and persisted) on a board.
///
/// Each counter records the highest id assigned so far for that kind; the
/// next assignment is `counter + 1`. Counters only ever advance, so removed
/// ids are never reused within a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCounters {
    pub lists: u64,
    pub cards: u64,
    pub subtasks: u64,
    pub tags: u64,
    pub presets: u64,
}

impl IdCounters {
    /// Assigns the next unused id of `kind`.
    ///
    /// # Panics
    ///
    /// Panics for [`EntityKind::Board`] — board ids come from the store at
    /// creation, never from document counters.
    pub fn allocate(&mut self, kind: EntityKind) -> u64 {
        let counter = self.slot(kind);
        *counter += 1;
        *counter
    }

    /// Records a caller-supplied id so later assignments cannot collide
    /// with it.
    pub fn observe(&mut self, kind: EntityKind, id: u64) {
        let counter = self.slot(kind);
        if id > *counter {
            *counter = id;
        }
    }

    fn slot(&mut self, kind: EntityKind) -> &mut u64 {
        match kind {
            EntityKind::CardList => &mut self.lists,
            EntityKind::Card => &mut self.cards,
            EntityKind::Subtask => &mut self.subtasks,
            EntityKind::Tag => &mut self.tags,
            EntityKind::ColorPreset => &mut self.presets,
            EntityKind::Board => unreachable!("board ids are assigned by the store"),
        }
    }
}

/// A board document — the root of the entity tree and the unit of
/// subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Document id, assigned by the store at creation.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Font color (e.g. `#1a1a1a`).
    pub font_color: String,
    /// Background color.
    pub background_color: String,
    /// Ordered card lists; vector order is the canonical display order.
    pub lists: Vec<CardList>,
    /// Tags defined on this board, referenced by cards.
    pub tags: Vec<Tag>,
    /// Color presets offered to clients.
    pub presets: Vec<ColorPreset>,
    /// Id of the default color preset, or [`NIL_ID`] for none.
    pub default_preset_id: u64,
    /// Per-kind id counters for entities owned by this board.
    #[serde(default)]
    pub counters: IdCounters,
}

impl Board {
    /// Creates an empty board with id 0; the store assigns the real id at
    /// creation.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            title: title.into(),
            font_color: String::new(),
            background_color: String::new(),
            lists: Vec::new(),
            tags: Vec::new(),
            presets: Vec::new(),
            default_preset_id: NIL_ID,
            counters: IdCounters::default(),
        }
    }

    /// Looks up a card list by id.
    pub fn list(&self, list_id: u64) -> Option<&CardList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    /// Looks up a tag by id.
    pub fn tag(&self, tag_id: u64) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag_id)
    }

    /// Looks up a color preset by id.
    pub fn preset(&self, preset_id: u64) -> Option<&ColorPreset> {
        self.presets.iter().find(|p| p.id == preset_id)
    }
}

/// An ordered list of cards within a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardList {
    pub id: u64,
    pub title: String,
    pub font_color: String,
    pub background_color: String,
    /// Ordered cards; vector order is the canonical display order.
    pub cards: Vec<Card>,
    /// Back-reference to the owning board. Lookup key only.
    pub board_id: u64,
}

impl CardList {
    /// Creates a list with id 0, to be assigned on insertion into a board.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            title: title.into(),
            font_color: String::new(),
            background_color: String::new(),
            cards: Vec::new(),
            board_id: NIL_ID,
        }
    }

    /// Looks up a card by id.
    pub fn card(&self, card_id: u64) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }
}

/// A card: the primary unit of work on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: u64,
    pub title: String,
    /// Free-form body text.
    pub text: String,
    /// Free-form category label.
    pub category: String,
    /// Optional due date. The UTC offset supplied by the client is
    /// preserved exactly, never normalized.
    pub due_date: Option<DateTime<FixedOffset>>,
    /// Ids of tags attached to this card. Each must resolve to a tag on the
    /// owning board.
    pub tag_ids: Vec<u64>,
    /// Ordered subtasks.
    pub subtasks: Vec<Subtask>,
    /// Back-reference to the owning list. Lookup key only.
    pub list_id: u64,
}

impl Card {
    /// Creates a card with id 0, to be assigned on insertion into a list.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            title: title.into(),
            text: String::new(),
            category: String::new(),
            due_date: None,
            tag_ids: Vec::new(),
            subtasks: Vec::new(),
            list_id: NIL_ID,
        }
    }

    /// Looks up a subtask by id.
    pub fn subtask(&self, subtask_id: u64) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

/// A checklist entry owned by a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: u64,
    pub name: String,
    pub done: bool,
    /// Back-reference to the owning card. Lookup key only.
    pub card_id: u64,
}

impl Subtask {
    /// Creates a subtask with id 0, to be assigned on insertion into a card.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            name: name.into(),
            done: false,
            card_id: NIL_ID,
        }
    }
}

/// A tag defined on a board and referenced by cards. Names are not required
/// to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub font_color: String,
    pub background_color: String,
    /// Back-reference to the owning board. Lookup key only.
    pub board_id: u64,
}

impl Tag {
    /// Creates a tag with id 0, to be assigned on insertion into a board.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            name: name.into(),
            font_color: String::new(),
            background_color: String::new(),
            board_id: NIL_ID,
        }
    }
}

/// A named font/background color pair offered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPreset {
    pub id: u64,
    pub name: String,
    pub font_color: String,
    pub background_color: String,
}

impl ColorPreset {
    /// Creates a preset with id 0, to be assigned on insertion into a board.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NIL_ID,
            name: name.into(),
            font_color: String::new(),
            background_color: String::new(),
        }
    }
}
