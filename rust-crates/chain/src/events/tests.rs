#![allow(non_snake_case)]

use super::*;
use serde_json::json;

fn event(kind: EventKind, payload: Value, timestamp_ms: Option<u64>) -> ChainEvent {
    let package: ObjectId = "0x1234".parse().unwrap();
    ChainEvent {
        id: EventCursor {
            tx_digest: "digest".to_string(),
            event_seq: "3".to_string(),
        },
        event_type: kind.type_name(&package),
        sender: None,
        parsed_json: payload,
        timestamp_ms,
    }
}

#[test]
fn from_type_name__matches_world_module_only() {
    assert_eq!(
        EventKind::from_type_name("0x1::world::ChunkSoldEvent"),
        Some(EventKind::ChunkSold)
    );
    assert_eq!(EventKind::from_type_name("0x1::market::ChunkSoldEvent"), None);
    assert_eq!(EventKind::from_type_name("ChunkSoldEvent"), None);
}

#[test]
fn decode__listed_event_with_nested_ids_and_string_price__is_typed() {
    // given
    let raw = event(
        EventKind::ChunkListed,
        json!({
            "world_id": { "id": "0xaa" },
            "chunk_id": "0xbb",
            "seller": "0xcc",
            "price": "25",
        }),
        Some(1_000),
    );

    // when
    let decoded = ChunkListedEvent::decode(&raw).unwrap();

    // then
    assert_eq!(decoded.event.world_id, "0xaa".parse().unwrap());
    assert_eq!(decoded.event.chunk_id, "0xbb".parse().unwrap());
    assert_eq!(decoded.event.seller, Some("0xcc".parse().unwrap()));
    assert_eq!(decoded.event.price, 25);
    assert_eq!(decoded.recency.timestamp_ms, Some(1_000));
    assert_eq!(decoded.recency.event_seq, 3);
}

#[test]
fn decode__listed_event_without_price__reports_missing_field() {
    // given
    let raw = event(
        EventKind::ChunkListed,
        json!({ "world_id": "0xaa", "chunk_id": "0xbb" }),
        None,
    );

    // when
    let result = ChunkListedEvent::decode(&raw);

    // then
    assert_eq!(
        result,
        Err(DecodeError::MissingField {
            kind: EventKind::ChunkListed,
            field: "price",
        })
    );
}

#[test]
fn decode__zero_price__is_rejected() {
    let raw = event(
        EventKind::ChunkSold,
        json!({ "world_id": "0xaa", "chunk_id": "0xbb", "price": 0 }),
        None,
    );

    assert!(matches!(
        ChunkSoldEvent::decode(&raw),
        Err(DecodeError::MissingField { field: "price", .. })
    ));
}

#[test]
fn decode__wrong_kind__is_rejected() {
    let raw = event(EventKind::ChunkDelisted, json!({ "chunk_id": "0xbb" }), None);

    assert!(matches!(
        ChunkListedEvent::decode(&raw),
        Err(DecodeError::WrongType { .. })
    ));
}

#[test]
fn decode__play_id_as_number_or_string__yields_same_id() {
    let as_number = event(EventKind::PlayCreated, json!({ "play_id": 7 }), None);
    let as_string = event(EventKind::PlayCreated, json!({ "play_id": "7" }), None);

    assert_eq!(
        PlayCreatedEvent::decode(&as_number).unwrap().event.play_id,
        PlayId(7)
    );
    assert_eq!(
        PlayCreatedEvent::decode(&as_string).unwrap().event.play_id,
        PlayId(7)
    );
}

#[test]
fn find_in__skips_other_events_in_transaction() {
    // given
    let events = vec![
        event(EventKind::ChunkDelisted, json!({ "chunk_id": "0x1" }), None),
        event(
            EventKind::RewardClaimed,
            json!({ "play_id": "9", "reward": "40" }),
            None,
        ),
    ];

    // when
    let found = RewardClaimedEvent::find_in(&events).unwrap();

    // then
    assert_eq!(found.event.play_id, PlayId(9));
    assert_eq!(found.event.reward, Some(40));
}

#[test]
fn world_event_decode__unknown_type__is_error() {
    let mut raw = event(EventKind::WorldCreated, json!({ "world_id": "0x1" }), None);
    raw.event_type = "0x1::world::SomethingElse".to_string();

    assert!(matches!(
        WorldEvent::decode(&raw),
        Err(DecodeError::UnknownType(_))
    ));
}

#[test]
fn recency__missing_timestamp_sorts_before_any_timestamp() {
    let untimed = Recency {
        timestamp_ms: None,
        tx_digest: "z".to_string(),
        event_seq: 9,
    };
    let timed = Recency {
        timestamp_ms: Some(0),
        tx_digest: "a".to_string(),
        event_seq: 0,
    };

    assert!(untimed < timed);
}

#[test]
fn recency__same_checkpoint_different_transactions__neither_happened_after() {
    // given
    let listing = Recency {
        timestamp_ms: Some(100),
        tx_digest: "ZKq3vT9pXh2mWcR7".to_string(),
        event_seq: 0,
    };
    let sale = Recency {
        timestamp_ms: Some(100),
        tx_digest: "4fBnE8sJd1LyQa6u".to_string(),
        event_seq: 0,
    };

    // then
    assert!(listing > sale);
    assert!(!listing.happened_after(&sale));
    assert!(!sale.happened_after(&listing));
}

#[test]
fn recency__happened_after__uses_timestamp_then_sequence_within_a_transaction() {
    let first = Recency {
        timestamp_ms: Some(100),
        tx_digest: "9hTyQm2WcLx7".to_string(),
        event_seq: 0,
    };
    let second = Recency {
        event_seq: 1,
        ..first.clone()
    };
    let later = Recency {
        timestamp_ms: Some(101),
        tx_digest: "1111".to_string(),
        event_seq: 0,
    };

    assert!(second.happened_after(&first));
    assert!(!first.happened_after(&second));
    assert!(later.happened_after(&second));
    assert!(!first.happened_after(&first));
}
