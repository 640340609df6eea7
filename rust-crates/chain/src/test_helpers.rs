use crate::{
    events::{
        ChainEvent,
        EventKind,
    },
    ids::ObjectId,
    rpc::EventCursor,
};
use serde_json::Value;

pub fn test_package() -> ObjectId {
    "0x153e0a84431e269febf163f75fee2f26526849f48d408ee20b812a9329ac5374"
        .parse()
        .expect("valid package id")
}

pub fn object_id(byte: u8) -> ObjectId {
    format!("0x{}", hex::encode([byte; 32]))
        .parse()
        .expect("valid object id")
}

/// Builds an event of `kind` with the given payload. `seq` doubles as the
/// transaction digest suffix so events stay distinct.
pub fn chain_event(
    kind: EventKind,
    payload: Value,
    timestamp_ms: Option<u64>,
    seq: u64,
) -> ChainEvent {
    ChainEvent {
        id: EventCursor {
            tx_digest: format!("digest-{seq}"),
            event_seq: "0".to_string(),
        },
        event_type: kind.type_name(&test_package()),
        sender: None,
        parsed_json: payload,
        timestamp_ms,
    }
}
