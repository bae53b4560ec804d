//! The patch entry point and the patcher capability objects.

use chrono::{DateTime, FixedOffset};
use plank_events::BoardEvent;
use plank_types::{Board, Card, CardList, ColorPreset, EntityKind, IdCounters, Subtask, Tag, NIL_ID};

use crate::PatchError;

/// Applies a batch of mutations to `board` atomically.
///
/// The mutator runs against a working copy of the board held by the
/// patcher. On `Ok` the working copy replaces the board's observable state
/// exactly once and the ordered list of events — one per committed
/// operation — is returned. On `Err` no partial state change is observable
/// and the error surfaces to the caller.
pub fn patch<F>(board: &mut Board, mutate: F) -> Result<Vec<BoardEvent>, PatchError>
where
    F: FnOnce(&mut BoardPatcher) -> Result<(), PatchError>,
{
    let mut patcher = BoardPatcher {
        board: board.clone(),
        events: Vec::new(),
    };
    mutate(&mut patcher)?;
    *board = patcher.board;
    Ok(patcher.events)
}

/// Scoped mutation capability bound to one board for the duration of a
/// [`patch`] call.
///
/// Only the operations whitelisted here can touch the tree, so id
/// uniqueness, ordering, and cascade rules are enforced in one place.
/// Collection operations follow a uniform shape: `add_*` assigns the next
/// unused id of the kind when the value carries id 0 and appends to the end
/// of the owning sequence; `remove_*` cascades; `move_*` relocates an entry
/// to immediately follow `after_id`, with `after_id = 0` meaning the head of
/// the sequence.
pub struct BoardPatcher {
    board: Board,
    events: Vec<BoardEvent>,
}

impl BoardPatcher {
    /// Read access to the board mid-patch, reflecting operations already
    /// applied in this call.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.board.title = title.clone();
        self.events.push(BoardEvent::BoardTitleSet {
            board_id: self.board.id,
            title,
        });
    }

    pub fn set_colors(
        &mut self,
        font_color: impl Into<String>,
        background_color: impl Into<String>,
    ) {
        let font_color = font_color.into();
        let background_color = background_color.into();
        self.board.font_color = font_color.clone();
        self.board.background_color = background_color.clone();
        self.events.push(BoardEvent::BoardColorsSet {
            board_id: self.board.id,
            font_color,
            background_color,
        });
    }

    /// Sets the board's default color preset; `preset_id = 0` clears it.
    pub fn set_default_preset(&mut self, preset_id: u64) -> Result<(), PatchError> {
        if preset_id != NIL_ID && self.board.preset(preset_id).is_none() {
            return Err(PatchError::NotFound(EntityKind::ColorPreset, preset_id));
        }
        self.board.default_preset_id = preset_id;
        self.events.push(BoardEvent::DefaultPresetSet {
            board_id: self.board.id,
            preset_id,
        });
        Ok(())
    }

    /// Appends a card list, assigning ids to the list and to any cards and
    /// subtasks the caller pre-populated it with.
    pub fn add_list(&mut self, mut list: CardList) -> Result<u64, PatchError> {
        ensure_new_id(&self.board.lists, EntityKind::CardList, list.id, |l| l.id)?;
        list.id = claim_id(&mut self.board.counters, EntityKind::CardList, list.id);
        list.board_id = self.board.id;

        let cards = std::mem::take(&mut list.cards);
        for card in cards {
            ensure_new_id(&list.cards, EntityKind::Card, card.id, |c| c.id)?;
            let card = adopt_card(&mut self.board.counters, &self.board.tags, list.id, card)?;
            list.cards.push(card);
        }

        let id = list.id;
        self.events.push(BoardEvent::ListCreated {
            board_id: self.board.id,
            list: list.clone(),
        });
        self.board.lists.push(list);
        Ok(id)
    }

    /// Removes a card list and everything it owns.
    pub fn remove_list(&mut self, list_id: u64) -> Result<(), PatchError> {
        remove_entry(&mut self.board.lists, EntityKind::CardList, list_id, |l| l.id)?;
        self.events.push(BoardEvent::ListRemoved {
            board_id: self.board.id,
            list_id,
        });
        Ok(())
    }

    pub fn move_list(&mut self, list_id: u64, after_id: u64) -> Result<(), PatchError> {
        if move_entry(
            &mut self.board.lists,
            EntityKind::CardList,
            list_id,
            after_id,
            |l| l.id,
        )? {
            self.events.push(BoardEvent::ListMoved {
                board_id: self.board.id,
                list_id,
                after_id,
            });
        }
        Ok(())
    }

    pub fn add_tag(&mut self, mut tag: Tag) -> Result<u64, PatchError> {
        ensure_new_id(&self.board.tags, EntityKind::Tag, tag.id, |t| t.id)?;
        tag.id = claim_id(&mut self.board.counters, EntityKind::Tag, tag.id);
        tag.board_id = self.board.id;
        let id = tag.id;
        self.events.push(BoardEvent::TagCreated {
            board_id: self.board.id,
            tag: tag.clone(),
        });
        self.board.tags.push(tag);
        Ok(id)
    }

    /// Replaces a tag's name and colors.
    pub fn update_tag(
        &mut self,
        tag_id: u64,
        name: impl Into<String>,
        font_color: impl Into<String>,
        background_color: impl Into<String>,
    ) -> Result<(), PatchError> {
        let board_id = self.board.id;
        let tag = self
            .board
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or(PatchError::NotFound(EntityKind::Tag, tag_id))?;
        tag.name = name.into();
        tag.font_color = font_color.into();
        tag.background_color = background_color.into();
        let tag = tag.clone();
        self.events.push(BoardEvent::TagUpdated { board_id, tag });
        Ok(())
    }

    /// Removes a tag from the board and strips its reference from every
    /// card that held it, so no card retains a dangling reference.
    pub fn remove_tag(&mut self, tag_id: u64) -> Result<(), PatchError> {
        remove_entry(&mut self.board.tags, EntityKind::Tag, tag_id, |t| t.id)?;
        for list in &mut self.board.lists {
            for card in &mut list.cards {
                card.tag_ids.retain(|&id| id != tag_id);
            }
        }
        self.events.push(BoardEvent::TagRemoved {
            board_id: self.board.id,
            tag_id,
        });
        Ok(())
    }

    pub fn add_preset(&mut self, mut preset: ColorPreset) -> Result<u64, PatchError> {
        ensure_new_id(&self.board.presets, EntityKind::ColorPreset, preset.id, |p| p.id)?;
        preset.id = claim_id(&mut self.board.counters, EntityKind::ColorPreset, preset.id);
        let id = preset.id;
        self.events.push(BoardEvent::PresetCreated {
            board_id: self.board.id,
            preset: preset.clone(),
        });
        self.board.presets.push(preset);
        Ok(id)
    }

    /// Removes a color preset. If it was the board's default, the default
    /// resets to the 0 sentinel.
    pub fn remove_preset(&mut self, preset_id: u64) -> Result<(), PatchError> {
        remove_entry(&mut self.board.presets, EntityKind::ColorPreset, preset_id, |p| p.id)?;
        if self.board.default_preset_id == preset_id {
            self.board.default_preset_id = NIL_ID;
        }
        self.events.push(BoardEvent::PresetRemoved {
            board_id: self.board.id,
            preset_id,
        });
        Ok(())
    }

    /// Scoped capability for one card list.
    pub fn list(&mut self, list_id: u64) -> Result<ListPatcher<'_>, PatchError> {
        if self.board.list(list_id).is_none() {
            return Err(PatchError::NotFound(EntityKind::CardList, list_id));
        }
        Ok(ListPatcher {
            patcher: self,
            list_id,
        })
    }
}

/// Split borrow of the pieces a list operation needs.
struct ListParts<'x> {
    list: &'x mut CardList,
    tags: &'x [Tag],
    counters: &'x mut IdCounters,
    events: &'x mut Vec<BoardEvent>,
}

/// Scoped mutation capability for one card list within a patch.
///
/// Holding a `ListPatcher` mutably borrows the board patcher, so no
/// board-level operation can remove the list out from under it.
pub struct ListPatcher<'p> {
    patcher: &'p mut BoardPatcher,
    list_id: u64,
}

impl ListPatcher<'_> {
    fn parts(&mut self) -> Result<ListParts<'_>, PatchError> {
        let BoardPatcher { board, events } = &mut *self.patcher;
        let Board {
            lists,
            tags,
            counters,
            ..
        } = board;
        let list = lists
            .iter_mut()
            .find(|l| l.id == self.list_id)
            .ok_or(PatchError::NotFound(EntityKind::CardList, self.list_id))?;
        Ok(ListParts {
            list,
            tags: tags.as_slice(),
            counters,
            events,
        })
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), PatchError> {
        let title = title.into();
        let p = self.parts()?;
        p.list.title = title.clone();
        p.events.push(BoardEvent::ListTitleSet {
            list_id: p.list.id,
            title,
        });
        Ok(())
    }

    pub fn set_colors(
        &mut self,
        font_color: impl Into<String>,
        background_color: impl Into<String>,
    ) -> Result<(), PatchError> {
        let font_color = font_color.into();
        let background_color = background_color.into();
        let p = self.parts()?;
        p.list.font_color = font_color.clone();
        p.list.background_color = background_color.clone();
        p.events.push(BoardEvent::ListColorsSet {
            list_id: p.list.id,
            font_color,
            background_color,
        });
        Ok(())
    }

    /// Appends a card, validating its tag references against the board's
    /// tag set and assigning ids to the card and its subtasks.
    pub fn add_card(&mut self, card: Card) -> Result<u64, PatchError> {
        let p = self.parts()?;
        ensure_new_id(&p.list.cards, EntityKind::Card, card.id, |c| c.id)?;
        let card = adopt_card(p.counters, p.tags, p.list.id, card)?;
        let id = card.id;
        p.events.push(BoardEvent::CardCreated {
            list_id: p.list.id,
            card: card.clone(),
        });
        p.list.cards.push(card);
        Ok(id)
    }

    /// Removes a card and everything it owns.
    pub fn remove_card(&mut self, card_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        remove_entry(&mut p.list.cards, EntityKind::Card, card_id, |c| c.id)?;
        p.events.push(BoardEvent::CardRemoved {
            list_id: p.list.id,
            card_id,
        });
        Ok(())
    }

    pub fn move_card(&mut self, card_id: u64, after_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        if move_entry(&mut p.list.cards, EntityKind::Card, card_id, after_id, |c| c.id)? {
            p.events.push(BoardEvent::CardMoved {
                list_id: p.list.id,
                card_id,
                after_id,
            });
        }
        Ok(())
    }

    /// Scoped capability for one card.
    pub fn card(&mut self, card_id: u64) -> Result<CardPatcher<'_>, PatchError> {
        {
            let p = self.parts()?;
            if p.list.card(card_id).is_none() {
                return Err(PatchError::NotFound(EntityKind::Card, card_id));
            }
        }
        let list_id = self.list_id;
        Ok(CardPatcher {
            patcher: &mut *self.patcher,
            list_id,
            card_id,
        })
    }
}

/// Split borrow of the pieces a card operation needs.
struct CardParts<'x> {
    card: &'x mut Card,
    tags: &'x [Tag],
    counters: &'x mut IdCounters,
    events: &'x mut Vec<BoardEvent>,
}

/// Scoped mutation capability for one card within a patch.
pub struct CardPatcher<'p> {
    patcher: &'p mut BoardPatcher,
    list_id: u64,
    card_id: u64,
}

impl CardPatcher<'_> {
    fn parts(&mut self) -> Result<CardParts<'_>, PatchError> {
        let BoardPatcher { board, events } = &mut *self.patcher;
        let Board {
            lists,
            tags,
            counters,
            ..
        } = board;
        let list = lists
            .iter_mut()
            .find(|l| l.id == self.list_id)
            .ok_or(PatchError::NotFound(EntityKind::CardList, self.list_id))?;
        let card = list
            .cards
            .iter_mut()
            .find(|c| c.id == self.card_id)
            .ok_or(PatchError::NotFound(EntityKind::Card, self.card_id))?;
        Ok(CardParts {
            card,
            tags: tags.as_slice(),
            counters,
            events,
        })
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), PatchError> {
        let title = title.into();
        let p = self.parts()?;
        p.card.title = title.clone();
        p.events.push(BoardEvent::CardTitleSet {
            card_id: p.card.id,
            title,
        });
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), PatchError> {
        let text = text.into();
        let p = self.parts()?;
        p.card.text = text.clone();
        p.events.push(BoardEvent::CardTextSet {
            card_id: p.card.id,
            text,
        });
        Ok(())
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> Result<(), PatchError> {
        let category = category.into();
        let p = self.parts()?;
        p.card.category = category.clone();
        p.events.push(BoardEvent::CardCategorySet {
            card_id: p.card.id,
            category,
        });
        Ok(())
    }

    /// Sets or clears the due date. The offset is stored exactly as given.
    pub fn set_due_date(
        &mut self,
        due_date: Option<DateTime<FixedOffset>>,
    ) -> Result<(), PatchError> {
        let p = self.parts()?;
        p.card.due_date = due_date;
        p.events.push(BoardEvent::CardDueDateSet {
            card_id: p.card.id,
            due_date,
        });
        Ok(())
    }

    /// Attaches a board tag to the card.
    pub fn add_tag_ref(&mut self, tag_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        if !p.tags.iter().any(|t| t.id == tag_id) {
            return Err(PatchError::NotFound(EntityKind::Tag, tag_id));
        }
        if p.card.tag_ids.contains(&tag_id) {
            return Err(PatchError::DuplicateId(EntityKind::Tag, tag_id));
        }
        p.card.tag_ids.push(tag_id);
        p.events.push(BoardEvent::CardTagAdded {
            card_id: p.card.id,
            tag_id,
        });
        Ok(())
    }

    /// Detaches a tag from the card.
    pub fn remove_tag_ref(&mut self, tag_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        let index = p
            .card
            .tag_ids
            .iter()
            .position(|&id| id == tag_id)
            .ok_or(PatchError::NotFound(EntityKind::Tag, tag_id))?;
        p.card.tag_ids.remove(index);
        p.events.push(BoardEvent::CardTagRemoved {
            card_id: p.card.id,
            tag_id,
        });
        Ok(())
    }

    pub fn add_subtask(&mut self, mut subtask: Subtask) -> Result<u64, PatchError> {
        let p = self.parts()?;
        ensure_new_id(&p.card.subtasks, EntityKind::Subtask, subtask.id, |s| s.id)?;
        subtask.id = claim_id(p.counters, EntityKind::Subtask, subtask.id);
        subtask.card_id = p.card.id;
        let id = subtask.id;
        p.events.push(BoardEvent::SubtaskCreated {
            card_id: p.card.id,
            subtask: subtask.clone(),
        });
        p.card.subtasks.push(subtask);
        Ok(id)
    }

    pub fn remove_subtask(&mut self, subtask_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        remove_entry(&mut p.card.subtasks, EntityKind::Subtask, subtask_id, |s| s.id)?;
        p.events.push(BoardEvent::SubtaskRemoved {
            card_id: p.card.id,
            subtask_id,
        });
        Ok(())
    }

    pub fn move_subtask(&mut self, subtask_id: u64, after_id: u64) -> Result<(), PatchError> {
        let p = self.parts()?;
        if move_entry(&mut p.card.subtasks, EntityKind::Subtask, subtask_id, after_id, |s| s.id)? {
            p.events.push(BoardEvent::SubtaskMoved {
                card_id: p.card.id,
                subtask_id,
                after_id,
            });
        }
        Ok(())
    }

    pub fn rename_subtask(
        &mut self,
        subtask_id: u64,
        name: impl Into<String>,
    ) -> Result<(), PatchError> {
        let name = name.into();
        let p = self.parts()?;
        let card_id = p.card.id;
        let subtask = p
            .card
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or(PatchError::NotFound(EntityKind::Subtask, subtask_id))?;
        subtask.name = name.clone();
        p.events.push(BoardEvent::SubtaskRenamed {
            card_id,
            subtask_id,
            name,
        });
        Ok(())
    }

    pub fn set_subtask_done(&mut self, subtask_id: u64, done: bool) -> Result<(), PatchError> {
        let p = self.parts()?;
        let card_id = p.card.id;
        let subtask = p
            .card
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or(PatchError::NotFound(EntityKind::Subtask, subtask_id))?;
        subtask.done = done;
        p.events.push(BoardEvent::SubtaskDoneSet {
            card_id,
            subtask_id,
            done,
        });
        Ok(())
    }
}

/// Resolves the id an inserted entity will carry: assigns the next unused id
/// of `kind` when the value carries the 0 sentinel, otherwise keeps the
/// supplied id and advances the kind's counter past it so later assignments
/// cannot collide.
fn claim_id(counters: &mut IdCounters, kind: EntityKind, supplied: u64) -> u64 {
    if supplied == NIL_ID {
        counters.allocate(kind)
    } else {
        counters.observe(kind, supplied);
        supplied
    }
}

fn ensure_new_id<T>(
    seq: &[T],
    kind: EntityKind,
    id: u64,
    key: impl Fn(&T) -> u64,
) -> Result<(), PatchError> {
    if id != NIL_ID && seq.iter().any(|entry| key(entry) == id) {
        return Err(PatchError::DuplicateId(kind, id));
    }
    Ok(())
}

fn remove_entry<T>(
    seq: &mut Vec<T>,
    kind: EntityKind,
    id: u64,
    key: impl Fn(&T) -> u64,
) -> Result<T, PatchError> {
    let index = seq
        .iter()
        .position(|entry| key(entry) == id)
        .ok_or(PatchError::NotFound(kind, id))?;
    Ok(seq.remove(index))
}

/// Relocates the entry with `id` to immediately follow `after_id`, or to
/// the head when `after_id` is the 0 sentinel. Returns `false` (and emits
/// nothing) for the move-after-itself no-op. O(n); the relative order of
/// untouched siblings is preserved.
fn move_entry<T>(
    seq: &mut Vec<T>,
    kind: EntityKind,
    id: u64,
    after_id: u64,
    key: impl Fn(&T) -> u64,
) -> Result<bool, PatchError> {
    let from = seq
        .iter()
        .position(|entry| key(entry) == id)
        .ok_or(PatchError::NotFound(kind, id))?;
    if after_id == id {
        return Ok(false);
    }
    let to = if after_id == NIL_ID {
        0
    } else {
        let anchor = seq
            .iter()
            .position(|entry| key(entry) == after_id)
            .ok_or(PatchError::NotFound(kind, after_id))?;
        // The anchor shifts left once the moved entry is taken out.
        if from < anchor {
            anchor
        } else {
            anchor + 1
        }
    };
    let entry = seq.remove(from);
    seq.insert(to, entry);
    Ok(true)
}

/// Validates a card's tag references, assigns ids to the card and its
/// subtasks, and wires up back-references for insertion into `list_id`.
fn adopt_card(
    counters: &mut IdCounters,
    tags: &[Tag],
    list_id: u64,
    mut card: Card,
) -> Result<Card, PatchError> {
    for (index, tag_id) in card.tag_ids.iter().enumerate() {
        if !tags.iter().any(|t| t.id == *tag_id) {
            return Err(PatchError::NotFound(EntityKind::Tag, *tag_id));
        }
        if card.tag_ids[..index].contains(tag_id) {
            return Err(PatchError::DuplicateId(EntityKind::Tag, *tag_id));
        }
    }

    card.id = claim_id(counters, EntityKind::Card, card.id);
    card.list_id = list_id;

    let subtasks = std::mem::take(&mut card.subtasks);
    for mut subtask in subtasks {
        ensure_new_id(&card.subtasks, EntityKind::Subtask, subtask.id, |s| s.id)?;
        subtask.id = claim_id(counters, EntityKind::Subtask, subtask.id);
        subtask.card_id = card.id;
        card.subtasks.push(subtask);
    }
    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn make_board() -> Board {
        let mut board = Board::new("Test board");
        board.id = 1;
        board
    }

    /// Board with one empty list (id 1).
    fn board_with_list() -> Board {
        let mut board = make_board();
        patch(&mut board, |p| {
            p.add_list(CardList::new("Todo"))?;
            Ok(())
        })
        .expect("setup patch should succeed");
        board
    }

    fn card_order(board: &Board, list_id: u64) -> Vec<u64> {
        board
            .list(list_id)
            .expect("list should exist")
            .cards
            .iter()
            .map(|c| c.id)
            .collect()
    }

    #[test]
    fn ids_are_assigned_per_kind_starting_at_one() {
        let mut board = make_board();
        patch(&mut board, |p| {
            let list_id = p.add_list(CardList::new("Todo"))?;
            assert_eq!(list_id, 1);
            let card_id = p.list(list_id)?.add_card(Card::new("c1"))?;
            assert_eq!(card_id, 1, "card ids are independent of list ids");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn add_assigns_ids_and_back_references() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.list(1)?.add_card(Card::new("c1"))?;
            Ok(())
        })
        .unwrap();

        let card = &board.lists[0].cards[0];
        assert_eq!(card.id, 1);
        assert_eq!(card.list_id, 1);
        assert_eq!(board.lists[0].board_id, 1);
    }

    #[test]
    fn move_order_algebra() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let mut list = p.list(1)?;
            list.add_card(Card::new("A"))?; // id 1
            list.add_card(Card::new("B"))?; // id 2
            list.add_card(Card::new("C"))?; // id 3
            Ok(())
        })
        .unwrap();

        patch(&mut board, |p| p.list(1)?.move_card(2, NIL_ID)).unwrap();
        assert_eq!(card_order(&board, 1), vec![2, 1, 3], "B to head");

        patch(&mut board, |p| p.list(1)?.move_card(3, 2)).unwrap();
        assert_eq!(card_order(&board, 1), vec![2, 3, 1], "C after B");
    }

    #[test]
    fn move_forward_past_anchor() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let mut list = p.list(1)?;
            list.add_card(Card::new("A"))?;
            list.add_card(Card::new("B"))?;
            list.add_card(Card::new("C"))?;
            list.move_card(1, 3)?; // A after C
            Ok(())
        })
        .unwrap();
        assert_eq!(card_order(&board, 1), vec![2, 3, 1]);
    }

    #[test]
    fn move_after_itself_is_a_noop_and_emits_nothing() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let mut list = p.list(1)?;
            list.add_card(Card::new("A"))?;
            list.add_card(Card::new("B"))?;
            Ok(())
        })
        .unwrap();

        let events = patch(&mut board, |p| p.list(1)?.move_card(1, 1)).unwrap();
        assert!(events.is_empty());
        assert_eq!(card_order(&board, 1), vec![1, 2]);
    }

    #[test]
    fn move_with_missing_ids_fails() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.list(1)?.add_card(Card::new("A"))?;
            Ok(())
        })
        .unwrap();

        let err = patch(&mut board, |p| p.list(1)?.move_card(9, NIL_ID)).unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::Card, 9));

        let err = patch(&mut board, |p| p.list(1)?.move_card(1, 9)).unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::Card, 9));
    }

    #[test]
    fn remove_of_missing_id_fails_and_leaves_container_unchanged() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.list(1)?.add_card(Card::new("A"))?;
            Ok(())
        })
        .unwrap();

        let before = board.clone();
        let err = patch(&mut board, |p| p.list(1)?.remove_card(42)).unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::Card, 42));
        assert_eq!(board, before);
    }

    #[test]
    fn failed_patch_applies_nothing() {
        let mut board = board_with_list();
        let before = board.clone();

        // The first operation would succeed on its own; the second fails,
        // so neither may be observable.
        let err = patch(&mut board, |p| {
            p.list(1)?.add_card(Card::new("kept?"))?;
            p.remove_list(99)?;
            Ok(())
        })
        .unwrap_err();

        assert_eq!(err, PatchError::NotFound(EntityKind::CardList, 99));
        assert_eq!(board, before, "no partial state change is observable");
    }

    #[test]
    fn duplicate_supplied_id_is_rejected() {
        let mut board = board_with_list();
        let mut with_id = Card::new("first");
        with_id.id = 5;
        patch(&mut board, |p| {
            p.list(1)?.add_card(with_id.clone())?;
            Ok(())
        })
        .unwrap();

        let err = patch(&mut board, |p| {
            p.list(1)?.add_card(with_id.clone())?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, PatchError::DuplicateId(EntityKind::Card, 5));
    }

    #[test]
    fn supplied_id_advances_the_counter() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let mut card = Card::new("explicit");
            card.id = 5;
            p.list(1)?.add_card(card)?;
            let next = p.list(1)?.add_card(Card::new("assigned"))?;
            assert_eq!(next, 6);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn removed_ids_are_never_reused() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let mut list = p.list(1)?;
            let a = list.add_card(Card::new("A"))?;
            list.remove_card(a)?;
            let b = list.add_card(Card::new("B"))?;
            assert_eq!(b, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn list_move_and_remove() {
        let mut board = make_board();
        patch(&mut board, |p| {
            p.add_list(CardList::new("one"))?;
            p.add_list(CardList::new("two"))?;
            p.add_list(CardList::new("three"))?;
            p.move_list(3, NIL_ID)?;
            p.remove_list(2)?;
            Ok(())
        })
        .unwrap();

        let order: Vec<u64> = board.lists.iter().map(|l| l.id).collect();
        assert_eq!(order, vec![3, 1]);
    }

    #[test]
    fn removing_a_list_destroys_its_cards() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.list(1)?.add_card(Card::new("doomed"))?;
            p.remove_list(1)?;
            Ok(())
        })
        .unwrap();
        assert!(board.lists.is_empty());
    }

    #[test]
    fn tag_cascade_strips_references_from_every_card() {
        let mut board = make_board();
        patch(&mut board, |p| {
            let urgent = p.add_tag(Tag::new("urgent"))?;
            let later = p.add_tag(Tag::new("later"))?;
            let l1 = p.add_list(CardList::new("one"))?;
            let l2 = p.add_list(CardList::new("two"))?;
            for (list_id, title) in [(l1, "a"), (l1, "b"), (l2, "c")] {
                let card_id = p.list(list_id)?.add_card(Card::new(title))?;
                p.list(list_id)?.card(card_id)?.add_tag_ref(urgent)?;
            }
            p.list(l2)?.card(3)?.add_tag_ref(later)?;
            Ok(())
        })
        .unwrap();

        let events = patch(&mut board, |p| p.remove_tag(1)).unwrap();
        assert_eq!(
            events,
            vec![BoardEvent::TagRemoved {
                board_id: 1,
                tag_id: 1
            }]
        );

        for list in &board.lists {
            for card in &list.cards {
                assert!(
                    !card.tag_ids.contains(&1),
                    "card {} retains a dangling tag reference",
                    card.id
                );
            }
        }
        // The other tag's references survive.
        assert_eq!(board.lists[1].cards[0].tag_ids, vec![2]);
    }

    #[test]
    fn card_tag_reference_must_resolve() {
        let mut board = board_with_list();
        let mut card = Card::new("tagged");
        card.tag_ids.push(7);
        let err = patch(&mut board, |p| {
            p.list(1)?.add_card(card.clone())?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::Tag, 7));
    }

    #[test]
    fn duplicate_tag_reference_is_rejected() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.add_tag(Tag::new("t"))?;
            let card_id = p.list(1)?.add_card(Card::new("c"))?;
            p.list(1)?.card(card_id)?.add_tag_ref(1)?;
            Ok(())
        })
        .unwrap();

        let err = patch(&mut board, |p| p.list(1)?.card(1)?.add_tag_ref(1)).unwrap_err();
        assert_eq!(err, PatchError::DuplicateId(EntityKind::Tag, 1));
    }

    #[test]
    fn remove_tag_ref_requires_presence() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            p.add_tag(Tag::new("t"))?;
            p.list(1)?.add_card(Card::new("c"))?;
            Ok(())
        })
        .unwrap();

        let err = patch(&mut board, |p| p.list(1)?.card(1)?.remove_tag_ref(1)).unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::Tag, 1));
    }

    #[test]
    fn removing_default_preset_resets_the_sentinel() {
        let mut board = make_board();
        patch(&mut board, |p| {
            let id = p.add_preset(ColorPreset::new("slate"))?;
            p.set_default_preset(id)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(board.default_preset_id, 1);

        patch(&mut board, |p| p.remove_preset(1)).unwrap();
        assert_eq!(board.default_preset_id, NIL_ID);
    }

    #[test]
    fn default_preset_must_exist() {
        let mut board = make_board();
        let err = patch(&mut board, |p| p.set_default_preset(3)).unwrap_err();
        assert_eq!(err, PatchError::NotFound(EntityKind::ColorPreset, 3));
    }

    #[test]
    fn subtask_lifecycle() {
        let mut board = board_with_list();
        patch(&mut board, |p| {
            let card_id = p.list(1)?.add_card(Card::new("c"))?;
            let mut list = p.list(1)?;
            let mut card = list.card(card_id)?;
            let s1 = card.add_subtask(Subtask::new("one"))?;
            let s2 = card.add_subtask(Subtask::new("two"))?;
            card.move_subtask(s2, NIL_ID)?;
            card.rename_subtask(s1, "first")?;
            card.set_subtask_done(s1, true)?;
            Ok(())
        })
        .unwrap();

        let card = &board.lists[0].cards[0];
        let order: Vec<u64> = card.subtasks.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(card.subtasks[1].name, "first");
        assert!(card.subtasks[1].done);
        assert_eq!(card.subtasks[0].card_id, card.id);
    }

    #[test]
    fn due_date_is_stored_with_its_offset() {
        let due = FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 1, 17, 30, 0)
            .unwrap();

        let mut board = board_with_list();
        patch(&mut board, |p| {
            let card_id = p.list(1)?.add_card(Card::new("c"))?;
            p.list(1)?.card(card_id)?.set_due_date(Some(due))?;
            Ok(())
        })
        .unwrap();

        let stored = board.lists[0].cards[0].due_date.expect("due date set");
        assert_eq!(stored.offset(), due.offset());
        assert_eq!(stored.to_rfc3339(), due.to_rfc3339());
    }

    #[test]
    fn events_follow_operation_order() {
        let mut board = board_with_list();
        let events = patch(&mut board, |p| {
            let mut list = p.list(1)?;
            list.add_card(Card::new("c1"))?;
            list.add_card(Card::new("c2"))?;
            list.move_card(2, NIL_ID)?;
            Ok(())
        })
        .unwrap();

        let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["card_created", "card_created", "card_moved"]);
        match &events[2] {
            BoardEvent::CardMoved {
                list_id,
                card_id,
                after_id,
            } => {
                assert_eq!((*list_id, *card_id, *after_id), (1, 2, NIL_ID));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(card_order(&board, 1), vec![2, 1]);
    }

    #[test]
    fn creation_events_carry_assigned_ids() {
        let mut board = make_board();
        let events = patch(&mut board, |p| {
            p.add_list(CardList::new("Todo"))?;
            Ok(())
        })
        .unwrap();

        match &events[0] {
            BoardEvent::ListCreated { board_id, list } => {
                assert_eq!(*board_id, 1);
                assert_eq!(list.id, 1);
                assert_eq!(list.board_id, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn prepopulated_list_is_adopted_whole() {
        let mut board = make_board();
        let mut list = CardList::new("seeded");
        let mut card = Card::new("c");
        card.subtasks.push(Subtask::new("s"));
        list.cards.push(card);

        patch(&mut board, |p| {
            p.add_list(list.clone())?;
            Ok(())
        })
        .unwrap();

        let adopted = &board.lists[0];
        assert_eq!(adopted.id, 1);
        assert_eq!(adopted.cards[0].id, 1);
        assert_eq!(adopted.cards[0].list_id, 1);
        assert_eq!(adopted.cards[0].subtasks[0].id, 1);
        assert_eq!(adopted.cards[0].subtasks[0].card_id, 1);
    }

    #[test]
    fn board_setters_emit_events() {
        let mut board = make_board();
        let events = patch(&mut board, |p| {
            p.set_title("Renamed");
            p.set_colors("#000", "#fff");
            Ok(())
        })
        .unwrap();

        assert_eq!(board.title, "Renamed");
        assert_eq!(board.font_color, "#000");
        let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["board_title_set", "board_colors_set"]);
    }

    #[test]
    fn update_tag_emits_snapshot() {
        let mut board = make_board();
        patch(&mut board, |p| {
            p.add_tag(Tag::new("old"))?;
            Ok(())
        })
        .unwrap();

        let events =
            patch(&mut board, |p| p.update_tag(1, "new", "#fff", "#c00")).unwrap();
        match &events[0] {
            BoardEvent::TagUpdated { tag, .. } => {
                assert_eq!(tag.name, "new");
                assert_eq!(tag.background_color, "#c00");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(board.tags[0].name, "new");
    }
}
