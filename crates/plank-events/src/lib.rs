//! Event taxonomy and wire codec for the plank board platform.
//!
//! Every mutation applied through the board patch API maps 1:1 to a
//! [`BoardEvent`] variant; the broker fans the serialized events out to the
//! sessions subscribed to the affected board. Inbound traffic is the much
//! smaller [`ControlEvent`] set — currently just the subscribe request with
//! its id-0 unsubscribe sentinel.
//!
//! Both taxonomies are closed, internally tagged enums: the `type` field of
//! the JSON record is the discriminator, and [`decode`] / [`decode_control`]
//! reject unknown discriminators with a [`DecodeError`] rather than silently
//! dropping them.

mod error;
mod event;

pub use error::DecodeError;
pub use event::{BoardEvent, ControlEvent};

/// Serializes an outbound event to its wire form.
pub fn encode(event: &BoardEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Parses an outbound event from its wire form.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed JSON, missing fields, or an unknown
/// `type` discriminator.
pub fn decode(payload: &str) -> Result<BoardEvent, DecodeError> {
    Ok(serde_json::from_str(payload)?)
}

/// Parses an inbound control event from its wire form.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed JSON, missing fields, or an unknown
/// `type` discriminator.
pub fn decode_control(payload: &str) -> Result<ControlEvent, DecodeError> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use plank_types::{Card, CardList, ColorPreset, Subtask, Tag, NIL_ID};

    fn kathmandu_due_date() -> DateTime<FixedOffset> {
        // +05:45 — an offset that disappears if anything normalizes to UTC.
        FixedOffset::east_opt(5 * 3600 + 45 * 60)
            .expect("valid offset")
            .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
            .unwrap()
    }

    fn sample_card() -> Card {
        Card {
            id: 4,
            title: "Ship the release".to_string(),
            text: "cut the branch first".to_string(),
            category: "release".to_string(),
            due_date: Some(kathmandu_due_date()),
            tag_ids: vec![2, 9],
            subtasks: vec![Subtask {
                id: 1,
                name: "tag the commit".to_string(),
                done: false,
                card_id: 4,
            }],
            list_id: 2,
        }
    }

    /// One instance of every outbound variant.
    fn all_events() -> Vec<BoardEvent> {
        let list = CardList {
            id: 2,
            title: "Doing".to_string(),
            font_color: "#111111".to_string(),
            background_color: "#fafafa".to_string(),
            cards: vec![sample_card()],
            board_id: 1,
        };
        let tag = Tag {
            id: 9,
            name: "urgent".to_string(),
            font_color: "#ffffff".to_string(),
            background_color: "#cc0000".to_string(),
            board_id: 1,
        };
        let preset = ColorPreset {
            id: 3,
            name: "slate".to_string(),
            font_color: "#e2e8f0".to_string(),
            background_color: "#334155".to_string(),
        };
        let subtask = Subtask {
            id: 5,
            name: "write notes".to_string(),
            done: true,
            card_id: 4,
        };

        vec![
            BoardEvent::BoardTitleSet {
                board_id: 1,
                title: "Q2 Roadmap".to_string(),
            },
            BoardEvent::BoardColorsSet {
                board_id: 1,
                font_color: "#000000".to_string(),
                background_color: "#ffffff".to_string(),
            },
            BoardEvent::DefaultPresetSet {
                board_id: 1,
                preset_id: 3,
            },
            BoardEvent::ListCreated {
                board_id: 1,
                list: list.clone(),
            },
            BoardEvent::ListRemoved {
                board_id: 1,
                list_id: 2,
            },
            BoardEvent::ListMoved {
                board_id: 1,
                list_id: 2,
                after_id: NIL_ID,
            },
            BoardEvent::ListTitleSet {
                list_id: 2,
                title: "Done".to_string(),
            },
            BoardEvent::ListColorsSet {
                list_id: 2,
                font_color: "#222222".to_string(),
                background_color: "#eeeeee".to_string(),
            },
            BoardEvent::CardCreated {
                list_id: 2,
                card: sample_card(),
            },
            BoardEvent::CardRemoved {
                list_id: 2,
                card_id: 4,
            },
            BoardEvent::CardMoved {
                list_id: 2,
                card_id: 4,
                after_id: 7,
            },
            BoardEvent::CardTitleSet {
                card_id: 4,
                title: "Ship it".to_string(),
            },
            BoardEvent::CardTextSet {
                card_id: 4,
                text: "updated body".to_string(),
            },
            BoardEvent::CardCategorySet {
                card_id: 4,
                category: "ops".to_string(),
            },
            BoardEvent::CardDueDateSet {
                card_id: 4,
                due_date: Some(kathmandu_due_date()),
            },
            BoardEvent::CardDueDateSet {
                card_id: 4,
                due_date: None,
            },
            BoardEvent::CardTagAdded {
                card_id: 4,
                tag_id: 9,
            },
            BoardEvent::CardTagRemoved {
                card_id: 4,
                tag_id: 9,
            },
            BoardEvent::SubtaskCreated {
                card_id: 4,
                subtask: subtask.clone(),
            },
            BoardEvent::SubtaskRemoved {
                card_id: 4,
                subtask_id: 5,
            },
            BoardEvent::SubtaskMoved {
                card_id: 4,
                subtask_id: 5,
                after_id: NIL_ID,
            },
            BoardEvent::SubtaskRenamed {
                card_id: 4,
                subtask_id: 5,
                name: "write release notes".to_string(),
            },
            BoardEvent::SubtaskDoneSet {
                card_id: 4,
                subtask_id: 5,
                done: false,
            },
            BoardEvent::TagCreated { board_id: 1, tag: tag.clone() },
            BoardEvent::TagUpdated { board_id: 1, tag },
            BoardEvent::TagRemoved {
                board_id: 1,
                tag_id: 9,
            },
            BoardEvent::PresetCreated {
                board_id: 1,
                preset,
            },
            BoardEvent::PresetRemoved {
                board_id: 1,
                preset_id: 3,
            },
            BoardEvent::Ack,
            BoardEvent::Error {
                message: "malformed control event".to_string(),
            },
        ]
    }

    #[test]
    fn every_variant_round_trips() {
        for event in all_events() {
            let json = encode(&event).expect("encode should not fail");
            let decoded = decode(&json).expect("decode should not fail");
            assert_eq!(decoded, event, "round trip mismatch for {}", event.kind());
        }
    }

    #[test]
    fn wire_tag_matches_kind() {
        for event in all_events() {
            let json = encode(&event).expect("encode should not fail");
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(
                value.get("type").and_then(|v| v.as_str()),
                Some(event.kind()),
                "discriminator mismatch for {}",
                event.kind()
            );
        }
    }

    #[test]
    fn due_date_offset_is_preserved_exactly() {
        let event = BoardEvent::CardDueDateSet {
            card_id: 4,
            due_date: Some(kathmandu_due_date()),
        };
        let json = encode(&event).expect("encode should not fail");
        assert!(
            json.contains("+05:45"),
            "serialized due date should carry the original offset: {json}"
        );

        let decoded = decode(&json).expect("decode should not fail");
        match decoded {
            BoardEvent::CardDueDateSet {
                due_date: Some(date),
                ..
            } => {
                assert_eq!(date.offset(), kathmandu_due_date().offset());
                assert_eq!(date.to_rfc3339(), kathmandu_due_date().to_rfc3339());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_fields_serialize_camel_case() {
        let event = BoardEvent::CardMoved {
            list_id: 2,
            card_id: 4,
            after_id: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "card_moved");
        assert_eq!(value["listId"], 2);
        assert_eq!(value["cardId"], 4);
        assert_eq!(value["afterId"], 0);
        assert!(value.get("card_id").is_none());
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let err = decode(r#"{"type":"card_teleported","cardId":1}"#)
            .expect_err("unknown discriminator must not decode");
        assert!(
            err.to_string().contains("card_teleported"),
            "error should name the unknown discriminator: {err}"
        );
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"cardId":1}"#).is_err(), "missing type tag");
        assert!(
            decode(r#"{"type":"card_removed"}"#).is_err(),
            "missing required fields"
        );
    }

    #[test]
    fn control_subscribe_decodes() {
        let event = decode_control(r#"{"type":"subscribe","boardId":12}"#)
            .expect("subscribe should decode");
        assert_eq!(event, ControlEvent::Subscribe { board_id: 12 });
    }

    #[test]
    fn control_unsubscribe_sentinel_decodes() {
        let event = decode_control(r#"{"type":"subscribe","boardId":0}"#)
            .expect("sentinel subscribe should decode");
        assert_eq!(event, ControlEvent::Subscribe { board_id: NIL_ID });
    }

    #[test]
    fn control_rejects_unknown_discriminator() {
        assert!(decode_control(r#"{"type":"publish","boardId":1}"#).is_err());
    }

    #[test]
    fn control_round_trips() {
        let event = ControlEvent::Subscribe { board_id: 42 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(decode_control(&json).unwrap(), event);
    }
}
