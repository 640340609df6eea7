use crate::{
    fields::{
        self,
        Fields,
    },
    ids::{
        Address,
        ObjectId,
        PlayId,
    },
    rpc::EventCursor,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

pub const WORLD_MODULE: &str = "world";

/// An event exactly as the chain reports it, before any decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvent {
    pub id: EventCursor,
    pub event_type: String,
    pub sender: Option<Address>,
    pub parsed_json: Value,
    pub timestamp_ms: Option<u64>,
}

impl ChainEvent {
    pub fn recency(&self) -> Recency {
        Recency {
            timestamp_ms: self.timestamp_ms,
            tx_digest: self.id.tx_digest.clone(),
            event_seq: self.id.event_seq.parse().unwrap_or(0),
        }
    }
}

/// Where an event sits in chain history.
///
/// The `Ord` impl is a total order for sorting output: timestamp first, then digest
/// and sequence so that ties sort the same way every time. Events without a
/// timestamp sort before all timestamped ones. Digests are not chronological, so
/// "did this happen after that" is [`Recency::happened_after`], not `>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Recency {
    pub timestamp_ms: Option<u64>,
    pub tx_digest: String,
    pub event_seq: u64,
}

impl Recency {
    /// Strictly later: a later timestamp, or a later event of the same transaction.
    /// Different transactions with the same timestamp (one checkpoint) are not
    /// ordered against each other, so neither happened after the other.
    pub fn happened_after(&self, other: &Recency) -> bool {
        match self.timestamp_ms.cmp(&other.timestamp_ms) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                self.tx_digest == other.tx_digest && self.event_seq > other.event_seq
            }
        }
    }
}

impl Ord for Recency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then_with(|| self.tx_digest.cmp(&other.tx_digest))
            .then_with(|| self.event_seq.cmp(&other.event_seq))
    }
}

impl PartialOrd for Recency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    WorldCreated,
    ChunkListed,
    ChunkSold,
    ChunkDelisted,
    PlayCreated,
    RewardClaimed,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::WorldCreated,
        EventKind::ChunkListed,
        EventKind::ChunkSold,
        EventKind::ChunkDelisted,
        EventKind::PlayCreated,
        EventKind::RewardClaimed,
    ];

    pub fn struct_name(self) -> &'static str {
        match self {
            EventKind::WorldCreated => "WorldCreatedEvent",
            EventKind::ChunkListed => "ChunkListedEvent",
            EventKind::ChunkSold => "ChunkSoldEvent",
            EventKind::ChunkDelisted => "ChunkDelistedEvent",
            EventKind::PlayCreated => "PlayCreatedEvent",
            EventKind::RewardClaimed => "RewardClaimedEvent",
        }
    }

    pub fn type_name(self, package: &ObjectId) -> String {
        format!("{package}::{WORLD_MODULE}::{}", self.struct_name())
    }

    /// Matches on `::world::<Struct>` so that short and long package spellings agree.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let mut parts = type_name.rsplitn(3, "::");
        let struct_name = parts.next()?;
        let module = parts.next()?;
        if module != WORLD_MODULE {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.struct_name() == struct_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected event type {actual}, wanted {expected:?}")]
    WrongType {
        expected: EventKind,
        actual: String,
    },
    #[error("unknown event type {0}")]
    UnknownType(String),
    #[error("{kind:?} payload is not an object")]
    NotAnObject { kind: EventKind },
    #[error("{kind:?} is missing required field `{field}`")]
    MissingField {
        kind: EventKind,
        field: &'static str,
    },
}

/// A decoded event together with its position in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timed<T> {
    pub recency: Recency,
    pub event: T,
}

/// Strongly-typed decode of one event payload.
pub trait DecodeEvent: Sized {
    const KIND: EventKind;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError>;

    fn decode(event: &ChainEvent) -> Result<Timed<Self>, DecodeError> {
        match EventKind::from_type_name(&event.event_type) {
            Some(kind) if kind == Self::KIND => {}
            _ => {
                return Err(DecodeError::WrongType {
                    expected: Self::KIND,
                    actual: event.event_type.clone(),
                });
            }
        }
        let fields = fields::normalize_fields(&event.parsed_json)
            .ok_or(DecodeError::NotAnObject { kind: Self::KIND })?;
        let inner = Self::decode_fields(fields)?;
        Ok(Timed {
            recency: event.recency(),
            event: inner,
        })
    }

    /// First event of this kind among a transaction's events that decodes cleanly.
    fn find_in(events: &[ChainEvent]) -> Option<Timed<Self>> {
        events.iter().find_map(|event| Self::decode(event).ok())
    }
}

fn required<T>(
    kind: EventKind,
    field: &'static str,
    value: Option<T>,
) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField { kind, field })
}

fn id_field(fields: &Fields, names: &[&str]) -> Option<ObjectId> {
    fields::field(fields, names).and_then(fields::object_id)
}

fn address_field(fields: &Fields, names: &[&str]) -> Option<Address> {
    fields::field(fields, names).and_then(fields::address)
}

fn u64_field(fields: &Fields, names: &[&str]) -> Option<u64> {
    fields::field(fields, names).and_then(fields::parse_u64)
}

fn play_id_field(fields: &Fields) -> Option<PlayId> {
    u64_field(fields, &["play_id", "playId"]).map(PlayId)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldCreatedEvent {
    pub world_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkListedEvent {
    pub world_id: ObjectId,
    pub chunk_id: ObjectId,
    pub seller: Option<Address>,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSoldEvent {
    pub world_id: ObjectId,
    pub chunk_id: ObjectId,
    pub seller: Option<Address>,
    pub buyer: Option<Address>,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelistedEvent {
    pub chunk_id: ObjectId,
    pub world_id: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCreatedEvent {
    pub play_id: PlayId,
    pub world_id: Option<ObjectId>,
    pub creator: Option<Address>,
    pub min_reward: u64,
    pub max_reward: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaimedEvent {
    pub play_id: PlayId,
    pub recipient: Option<Address>,
    pub reward: Option<u64>,
}

impl DecodeEvent for WorldCreatedEvent {
    const KIND: EventKind = EventKind::WorldCreated;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        Ok(Self {
            world_id: required(
                Self::KIND,
                "world_id",
                id_field(fields, &["world_id", "worldId"]),
            )?,
        })
    }
}

impl DecodeEvent for ChunkListedEvent {
    const KIND: EventKind = EventKind::ChunkListed;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        let chunk_id = required(
            Self::KIND,
            "chunk_id",
            id_field(fields, &["chunk_id", "chunkId"]),
        )?;
        let world_id = required(
            Self::KIND,
            "world_id",
            id_field(fields, &["world_id", "worldId"]),
        )?;
        // a zero price is as unusable as a missing one
        let price = required(
            Self::KIND,
            "price",
            u64_field(fields, &["price"]).filter(|price| *price > 0),
        )?;
        Ok(Self {
            world_id,
            chunk_id,
            seller: address_field(fields, &["seller"]),
            price,
        })
    }
}

impl DecodeEvent for ChunkSoldEvent {
    const KIND: EventKind = EventKind::ChunkSold;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        let chunk_id = required(
            Self::KIND,
            "chunk_id",
            id_field(fields, &["chunk_id", "chunkId"]),
        )?;
        let world_id = required(
            Self::KIND,
            "world_id",
            id_field(fields, &["world_id", "worldId"]),
        )?;
        let price = required(
            Self::KIND,
            "price",
            u64_field(fields, &["price"]).filter(|price| *price > 0),
        )?;
        Ok(Self {
            world_id,
            chunk_id,
            seller: address_field(fields, &["seller"]),
            buyer: address_field(fields, &["buyer"]),
            price,
        })
    }
}

impl DecodeEvent for ChunkDelistedEvent {
    const KIND: EventKind = EventKind::ChunkDelisted;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        Ok(Self {
            chunk_id: required(
                Self::KIND,
                "chunk_id",
                id_field(fields, &["chunk_id", "chunkId"]),
            )?,
            world_id: id_field(fields, &["world_id", "worldId"]),
        })
    }
}

impl DecodeEvent for PlayCreatedEvent {
    const KIND: EventKind = EventKind::PlayCreated;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        Ok(Self {
            play_id: required(Self::KIND, "play_id", play_id_field(fields))?,
            world_id: id_field(fields, &["world_id", "worldId"]),
            creator: address_field(fields, &["creator"]),
            min_reward: u64_field(fields, &["min_reward", "minReward"]).unwrap_or(0),
            max_reward: u64_field(fields, &["max_reward", "maxReward"]).unwrap_or(0),
        })
    }
}

impl DecodeEvent for RewardClaimedEvent {
    const KIND: EventKind = EventKind::RewardClaimed;

    fn decode_fields(fields: &Fields) -> Result<Self, DecodeError> {
        Ok(Self {
            play_id: required(Self::KIND, "play_id", play_id_field(fields))?,
            recipient: address_field(fields, &["recipient"]),
            reward: u64_field(fields, &["reward"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    WorldCreated(WorldCreatedEvent),
    ChunkListed(ChunkListedEvent),
    ChunkSold(ChunkSoldEvent),
    ChunkDelisted(ChunkDelistedEvent),
    PlayCreated(PlayCreatedEvent),
    RewardClaimed(RewardClaimedEvent),
}

impl WorldEvent {
    pub fn decode(event: &ChainEvent) -> Result<Timed<WorldEvent>, DecodeError> {
        fn wrap<T: DecodeEvent>(
            event: &ChainEvent,
            f: fn(T) -> WorldEvent,
        ) -> Result<Timed<WorldEvent>, DecodeError> {
            let Timed { recency, event } = T::decode(event)?;
            Ok(Timed {
                recency,
                event: f(event),
            })
        }

        match EventKind::from_type_name(&event.event_type) {
            Some(EventKind::WorldCreated) => wrap(event, WorldEvent::WorldCreated),
            Some(EventKind::ChunkListed) => wrap(event, WorldEvent::ChunkListed),
            Some(EventKind::ChunkSold) => wrap(event, WorldEvent::ChunkSold),
            Some(EventKind::ChunkDelisted) => wrap(event, WorldEvent::ChunkDelisted),
            Some(EventKind::PlayCreated) => wrap(event, WorldEvent::PlayCreated),
            Some(EventKind::RewardClaimed) => wrap(event, WorldEvent::RewardClaimed),
            None => Err(DecodeError::UnknownType(event.event_type.clone())),
        }
    }
}

#[cfg(test)]
mod tests;
