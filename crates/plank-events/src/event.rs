//! Outbound and inbound event types.

use chrono::{DateTime, FixedOffset};
use plank_types::{Card, CardList, ColorPreset, Subtask, Tag};
use serde::{Deserialize, Serialize};

/// Outbound events, server → client.
///
/// One variant per mutation kind, parameterized by the ids and values
/// involved, plus the terminal `ack`/`error` acknowledgements. Creation
/// variants carry the full created entity snapshot (with its assigned id).
/// Move variants carry `(container id, moved id, after id)`; `after_id = 0`
/// means "head of the sequence", the same sentinel convention the patch API
/// uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    // ── Board ────────────────────────────────────────────────────────
    BoardTitleSet {
        board_id: u64,
        title: String,
    },
    BoardColorsSet {
        board_id: u64,
        font_color: String,
        background_color: String,
    },
    /// The board's default color preset changed; `preset_id = 0` clears it.
    DefaultPresetSet {
        board_id: u64,
        preset_id: u64,
    },

    // ── Card lists ───────────────────────────────────────────────────
    ListCreated {
        board_id: u64,
        list: CardList,
    },
    /// Removal destroys the list's cards with it.
    ListRemoved {
        board_id: u64,
        list_id: u64,
    },
    ListMoved {
        board_id: u64,
        list_id: u64,
        after_id: u64,
    },
    ListTitleSet {
        list_id: u64,
        title: String,
    },
    ListColorsSet {
        list_id: u64,
        font_color: String,
        background_color: String,
    },

    // ── Cards ────────────────────────────────────────────────────────
    CardCreated {
        list_id: u64,
        card: Card,
    },
    CardRemoved {
        list_id: u64,
        card_id: u64,
    },
    CardMoved {
        list_id: u64,
        card_id: u64,
        after_id: u64,
    },
    CardTitleSet {
        card_id: u64,
        title: String,
    },
    CardTextSet {
        card_id: u64,
        text: String,
    },
    CardCategorySet {
        card_id: u64,
        category: String,
    },
    /// The due date's UTC offset is carried exactly as the client set it.
    CardDueDateSet {
        card_id: u64,
        due_date: Option<DateTime<FixedOffset>>,
    },
    CardTagAdded {
        card_id: u64,
        tag_id: u64,
    },
    CardTagRemoved {
        card_id: u64,
        tag_id: u64,
    },

    // ── Subtasks ─────────────────────────────────────────────────────
    SubtaskCreated {
        card_id: u64,
        subtask: Subtask,
    },
    SubtaskRemoved {
        card_id: u64,
        subtask_id: u64,
    },
    SubtaskMoved {
        card_id: u64,
        subtask_id: u64,
        after_id: u64,
    },
    SubtaskRenamed {
        card_id: u64,
        subtask_id: u64,
        name: String,
    },
    SubtaskDoneSet {
        card_id: u64,
        subtask_id: u64,
        done: bool,
    },

    // ── Tags ─────────────────────────────────────────────────────────
    TagCreated {
        board_id: u64,
        tag: Tag,
    },
    TagUpdated {
        board_id: u64,
        tag: Tag,
    },
    /// Removal also strips the tag's reference from every card that held it.
    TagRemoved {
        board_id: u64,
        tag_id: u64,
    },

    // ── Color presets ────────────────────────────────────────────────
    PresetCreated {
        board_id: u64,
        preset: ColorPreset,
    },
    /// Removal of the board's default preset resets the default to 0.
    PresetRemoved {
        board_id: u64,
        preset_id: u64,
    },

    // ── Terminal acknowledgements ────────────────────────────────────
    /// The inbound message was processed.
    Ack,
    /// A contained failure the client should surface; the connection stays
    /// open.
    Error {
        message: String,
    },
}

impl BoardEvent {
    /// Returns the wire discriminator for this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BoardTitleSet { .. } => "board_title_set",
            Self::BoardColorsSet { .. } => "board_colors_set",
            Self::DefaultPresetSet { .. } => "default_preset_set",
            Self::ListCreated { .. } => "list_created",
            Self::ListRemoved { .. } => "list_removed",
            Self::ListMoved { .. } => "list_moved",
            Self::ListTitleSet { .. } => "list_title_set",
            Self::ListColorsSet { .. } => "list_colors_set",
            Self::CardCreated { .. } => "card_created",
            Self::CardRemoved { .. } => "card_removed",
            Self::CardMoved { .. } => "card_moved",
            Self::CardTitleSet { .. } => "card_title_set",
            Self::CardTextSet { .. } => "card_text_set",
            Self::CardCategorySet { .. } => "card_category_set",
            Self::CardDueDateSet { .. } => "card_due_date_set",
            Self::CardTagAdded { .. } => "card_tag_added",
            Self::CardTagRemoved { .. } => "card_tag_removed",
            Self::SubtaskCreated { .. } => "subtask_created",
            Self::SubtaskRemoved { .. } => "subtask_removed",
            Self::SubtaskMoved { .. } => "subtask_moved",
            Self::SubtaskRenamed { .. } => "subtask_renamed",
            Self::SubtaskDoneSet { .. } => "subtask_done_set",
            Self::TagCreated { .. } => "tag_created",
            Self::TagUpdated { .. } => "tag_updated",
            Self::TagRemoved { .. } => "tag_removed",
            Self::PresetCreated { .. } => "preset_created",
            Self::PresetRemoved { .. } => "preset_removed",
            Self::Ack => "ack",
            Self::Error { .. } => "error",
        }
    }
}

/// Inbound control events, client → server.
///
/// Currently a single variant: subscribe to a board. `board_id = 0` is the
/// explicit unsubscribe sentinel — valid because no real board ever has
/// id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlEvent {
    Subscribe { board_id: u64 },
}
