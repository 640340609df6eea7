//! Capability traits for the chain collaborator and the data they exchange.
//!
//! Each capability group is its own trait so that components only ask for what
//! they use and test fakes stay small.

use crate::{
    events::ChainEvent,
    ids::{
        Address,
        ObjectId,
        TxDigest,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// Position in an event feed, as handed out by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCursor {
    pub tx_digest: String,
    pub event_seq: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    Ascending,
    #[default]
    Descending,
}

/// Fully-qualified event type filter, `<package>::<module>::<Struct>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventQuery {
    pub move_event_type: String,
}

impl EventQuery {
    pub fn move_event_type(event_type: impl Into<String>) -> Self {
        Self {
            move_event_type: event_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPage {
    pub data: Vec<ChainEvent>,
    pub next_cursor: Option<EventCursor>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub object_id: ObjectId,
    pub object_type: Option<String>,
    /// Move struct fields (already unwrapped from the `content.fields` envelope).
    pub fields: Value,
}

/// Name of a dynamic field, used both for listing and for direct lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicFieldName {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicFieldInfo {
    pub name: DynamicFieldName,
    pub object_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub coin_object_id: ObjectId,
    pub balance: u64,
}

/// Events emitted by an executed transaction, as seen by the read side.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBlock {
    pub digest: TxDigest,
    pub events: Vec<ChainEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Object(ObjectId),
    Pure(Value),
}

impl CallArg {
    pub fn object(id: &ObjectId) -> Self {
        CallArg::Object(id.clone())
    }

    /// `vector<u8>` argument.
    pub fn bytes(bytes: &[u8]) -> Self {
        CallArg::Pure(Value::Array(
            bytes.iter().map(|b| Value::from(*b)).collect(),
        ))
    }

    /// `u64` argument. Encoded as a decimal string to stay exact.
    pub fn u64(value: u64) -> Self {
        CallArg::Pure(Value::String(value.to_string()))
    }

    pub fn to_json(&self) -> Value {
        match self {
            CallArg::Object(id) => Value::String(id.to_string()),
            CallArg::Pure(value) => value.clone(),
        }
    }
}

/// A single Move entry function call.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<CallArg>,
}

impl MoveCall {
    pub fn new(
        package: &ObjectId,
        module: impl Into<String>,
        function: impl Into<String>,
        arguments: Vec<CallArg>,
    ) -> Self {
        Self {
            package: package.clone(),
            module: module.into(),
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

pub trait ObjectReader {
    /// Current fields of an object; `None` when the object does not exist (or is
    /// wrapped and so has no standalone content).
    fn get_object(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = anyhow::Result<Option<ObjectData>>>;

    /// Results keep the order of `ids`.
    fn multi_get_objects(
        &self,
        ids: &[ObjectId],
    ) -> impl Future<Output = anyhow::Result<Vec<Option<ObjectData>>>>;

    fn dynamic_fields(
        &self,
        parent: &ObjectId,
        cursor: Option<String>,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Page<DynamicFieldInfo>>>;

    fn dynamic_field_object(
        &self,
        parent: &ObjectId,
        name: &DynamicFieldName,
    ) -> impl Future<Output = anyhow::Result<Option<ObjectData>>>;

    fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<ObjectData>>>;

    fn coins(
        &self,
        owner: &Address,
        coin_type: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Coin>>>;
}

pub trait EventReader {
    fn query_events(
        &self,
        query: &EventQuery,
        cursor: Option<EventCursor>,
        limit: usize,
        order: EventOrder,
    ) -> impl Future<Output = anyhow::Result<EventPage>>;
}

pub trait TransactionSubmitter {
    /// Signs and submits a call, returning as soon as the chain hands back a digest.
    /// The transaction is not necessarily queryable yet.
    fn submit(&self, call: &MoveCall) -> impl Future<Output = anyhow::Result<TxDigest>>;

    fn sender(&self) -> &Address;
}

pub trait TransactionReader {
    /// `Ok(None)` when the digest is not (yet) indexed.
    fn transaction_block(
        &self,
        digest: &TxDigest,
    ) -> impl Future<Output = anyhow::Result<Option<TransactionBlock>>>;
}
